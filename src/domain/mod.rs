pub mod board;
pub mod card;
pub mod list;
pub mod sorting;
pub mod status;

pub use board::{Board, BoardPatch, NewBoard};
pub use card::{Card, CardAssignment, CardPatch, NewCard};
pub use list::{List, ListPatch, NewList};
pub use sorting::{filter_cards, sort_cards, SortField, SortOrder, StatusFilter, TableFilter};
pub use status::{classify, transition, CardStatus, StatusColumn, StatusGroups};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row in one of the remote tables, as the sync layer sees it.
///
/// Everything beyond identity, scope parent, and ordering is opaque payload
/// carried by the concrete entity types.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Fields for an insert; the remote returns the full created row.
    type Draft: Send + 'static;

    /// Compiler-checked partial update merged into a row by identity.
    type Patch: Clone + Send + Sync + 'static;

    fn id(&self) -> Uuid;

    /// Identifier bounding the row's scope: the owning user for boards,
    /// the board for lists, the list for cards.
    fn parent_id(&self) -> Option<Uuid>;

    /// Merges a partial update into this row. Only fields present in the
    /// patch change; timestamps are left to the remote side.
    fn apply(&mut self, patch: &Self::Patch);

    /// Restores the scope's ordering invariant after a merge. Must be a
    /// stable sort so ties keep arrival order.
    fn sort(rows: &mut [Self]);
}

/// Entities carrying a dense `order_index` within their sibling group.
pub trait Ordered: Entity {
    fn order_index(&self) -> u32;
    fn set_order_index(&mut self, index: u32);
}

/// One entry of a reorder batch: the row and its new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub order_index: u32,
}
