use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Entity, Ordered};

/// A task card within a list.
///
/// `completed`/`completed_at` and the two optional dates feed the derived
/// lifecycle status (see `domain::status`); the status itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub order_index: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a card. New cards always start incomplete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCard {
    pub list_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub order_index: u32,
}

impl NewCard {
    /// Materializes the draft into a full row, as the remote side would.
    pub fn into_row(self, now: DateTime<Utc>) -> Card {
        Card {
            id: Uuid::new_v4(),
            list_id: self.list_id,
            title: self.title,
            description: self.description,
            color_label: None,
            start_date: self.start_date,
            due_date: self.due_date,
            completed: false,
            completed_at: None,
            order_index: self.order_index,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a card. Absent fields are untouched; nullable fields
/// distinguish "leave alone" (`None`) from "set to null" (`Some(None)`).
///
/// `list_id` moves the card to another list; the source scope drops it and
/// the destination scope picks it up from its own change feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_label: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<u32>,
}

/// A user assigned to a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardAssignment {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Entity for Card {
    type Draft = NewCard;
    type Patch = CardPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.list_id)
    }

    fn apply(&mut self, patch: &CardPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(color_label) = &patch.color_label {
            self.color_label = color_label.clone();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(list_id) = patch.list_id {
            self.list_id = list_id;
        }
        if let Some(order_index) = patch.order_index {
            self.order_index = order_index;
        }
    }

    fn sort(rows: &mut [Self]) {
        rows.sort_by_key(|c| c.order_index);
    }
}

impl Ordered for Card {
    fn order_index(&self) -> u32 {
        self.order_index
    }

    fn set_order_index(&mut self, index: u32) {
        self.order_index = index;
    }
}
