use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Entity;

/// A top-level board owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBoard {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub user_id: Uuid,
}

impl NewBoard {
    /// Materializes the draft into a full row, as the remote side would.
    pub fn into_row(self, now: DateTime<Utc>) -> Board {
        Board {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            color: self.color,
            user_id: self.user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a board. Absent fields are untouched; nullable fields
/// distinguish "leave alone" (`None`) from "set to null" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
}

impl Entity for Board {
    type Draft = NewBoard;
    type Patch = BoardPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.user_id)
    }

    fn apply(&mut self, patch: &BoardPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
    }

    /// Board listings show the newest board first.
    fn sort(rows: &mut [Self]) {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn board(title: &str, created_at: DateTime<Utc>) -> Board {
        Board {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            color: None,
            user_id: Uuid::new_v4(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_patch_merges_present_fields_only() {
        let mut b = board("Inbox", Utc::now());
        b.description = Some("old".to_string());

        b.apply(&BoardPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        });

        assert_eq!(b.title, "Renamed");
        assert_eq!(b.description.as_deref(), Some("old"));
    }

    #[test]
    fn test_patch_can_null_a_field() {
        let mut b = board("Inbox", Utc::now());
        b.color = Some("#3b82f6".to_string());

        b.apply(&BoardPatch {
            color: Some(None),
            ..Default::default()
        });

        assert!(b.color.is_none());
    }

    #[test]
    fn test_sort_newest_first() {
        let now = Utc::now();
        let mut rows = vec![
            board("old", now - Duration::days(2)),
            board("new", now),
            board("mid", now - Duration::days(1)),
        ];

        Board::sort(&mut rows);

        assert_eq!(rows[0].title, "new");
        assert_eq!(rows[1].title, "mid");
        assert_eq!(rows[2].title, "old");
    }

    #[test]
    fn test_deserialization_without_optional_fields() {
        let json = r#"{
            "id": "c5a9e2a4-0b6e-4f21-9f05-6a1fb0a4c8d1",
            "title": "Plain board",
            "user_id": "3f1f3c66-5dd4-4f37-9d2e-2a4c9b8e7f60",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }"#;

        let b: Board = serde_json::from_str(json).unwrap();
        assert!(b.description.is_none());
        assert!(b.color.is_none());
    }
}
