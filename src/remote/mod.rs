//! Contracts for the hosted data store.
//!
//! The remote side owns persistence, authorization, and change-feed delivery;
//! this layer only ever sees a CRUD surface per table, a session query, and a
//! stream of full-row change events.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{CardAssignment, Entity, PositionUpdate};
use crate::error::{Result, TavleError};

pub mod memory;

pub use memory::InMemoryRemote;

/// Bounds which rows a store fetches and subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// All rows belonging to the current session user. The remote side
    /// enforces the ownership filter; this layer never sees foreign rows.
    Owner,
    /// Rows under one parent (lists of a board, cards of a list).
    Parent(Uuid),
    /// Rows under any of several parents (cross-list card views).
    Parents(Vec<Uuid>),
    /// No parent selected yet; fetches resolve to an empty set and
    /// mutations short-circuit.
    Detached,
}

impl Scope {
    pub fn is_detached(&self) -> bool {
        matches!(self, Scope::Detached)
    }

    /// The single parent id, when this scope has one.
    pub fn parent(&self) -> Option<Uuid> {
        match self {
            Scope::Parent(id) => Some(*id),
            _ => None,
        }
    }
}

/// A change-feed event carrying a full row snapshot.
///
/// Deletes carry the old row. Events are snapshots, not diffs, so applying
/// them is idempotent and tolerates out-of-order delivery.
#[derive(Debug, Clone)]
pub enum ChangeEvent<E> {
    Inserted(E),
    Updated(E),
    Deleted(E),
}

impl<E: Entity> ChangeEvent<E> {
    pub fn row(&self) -> &E {
        match self {
            ChangeEvent::Inserted(row) | ChangeEvent::Updated(row) | ChangeEvent::Deleted(row) => {
                row
            }
        }
    }

    pub fn row_id(&self) -> Uuid {
        self.row().id()
    }
}

/// Receiving half of a change-feed subscription.
///
/// Dropping the feed tears the subscription down; the remote side stops
/// delivering on the next publish.
pub struct ChangeFeed<E> {
    pub(crate) rx: mpsc::UnboundedReceiver<ChangeEvent<E>>,
}

impl<E> ChangeFeed<E> {
    /// Waits for the next event. Returns `None` once the remote side has
    /// gone away.
    pub async fn recv(&mut self) -> Option<ChangeEvent<E>> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<ChangeEvent<E>> {
        self.rx.try_recv().ok()
    }
}

/// CRUD and change-feed surface of one remote table.
#[async_trait]
pub trait RemoteTable<E: Entity>: Send + Sync {
    /// All rows in the scope, in the entity's canonical order.
    async fn select(&self, scope: &Scope) -> Result<Vec<E>>;

    /// Inserts a row and returns it as created remotely.
    async fn insert(&self, draft: E::Draft) -> Result<E>;

    /// Updates one row by id.
    async fn update(&self, id: Uuid, patch: E::Patch) -> Result<()>;

    /// Deletes one row by id.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Applies a whole reorder batch atomically: either every row gets its
    /// new position or none does.
    async fn update_positions(&self, _batch: &[PositionUpdate]) -> Result<()> {
        Err(TavleError::Remote(
            "table does not support position updates".to_string(),
        ))
    }

    /// Opens a change feed for the scope.
    fn subscribe(&self, scope: &Scope) -> ChangeFeed<E>;
}

/// Identity of the current session.
#[async_trait]
pub trait Session: Send + Sync {
    /// The signed-in user, or `None` when there is no active session.
    async fn current_user(&self) -> Result<Option<Uuid>>;
}

/// Per-card user assignments.
#[async_trait]
pub trait AssignmentApi: Send + Sync {
    async fn assignments(&self, card_id: Uuid) -> Result<Vec<CardAssignment>>;

    async fn assign(&self, card_id: Uuid, user_id: Uuid) -> Result<CardAssignment>;

    async fn unassign(&self, card_id: Uuid, user_id: Uuid) -> Result<()>;
}
