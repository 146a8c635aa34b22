use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Entity, Ordered};

/// A column of cards within a board.
///
/// `order_index` values of a board's lists form a dense zero-based sequence;
/// reordering reassigns the whole sequence (see `store::reorder`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub order_index: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewList {
    pub board_id: Uuid,
    pub title: String,
    pub order_index: u32,
}

impl NewList {
    /// Materializes the draft into a full row, as the remote side would.
    pub fn into_row(self, now: DateTime<Utc>) -> List {
        List {
            id: Uuid::new_v4(),
            board_id: self.board_id,
            title: self.title,
            order_index: self.order_index,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<u32>,
}

impl Entity for List {
    type Draft = NewList;
    type Patch = ListPatch;

    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        Some(self.board_id)
    }

    fn apply(&mut self, patch: &ListPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(order_index) = patch.order_index {
            self.order_index = order_index;
        }
    }

    fn sort(rows: &mut [Self]) {
        rows.sort_by_key(|l| l.order_index);
    }
}

impl Ordered for List {
    fn order_index(&self) -> u32 {
        self.order_index
    }

    fn set_order_index(&mut self, index: u32) {
        self.order_index = index;
    }
}
