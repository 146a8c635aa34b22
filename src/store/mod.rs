//! Local state synchronization over the remote tables.
//!
//! One [`EntityStore`] instance owns the in-memory collection for one entity
//! type in one scope. Mutations are optimistic: local state changes first,
//! the remote call follows, and a failure rolls the local change back and
//! raises an error notification. Change-feed events merge in through
//! [`EntityStore::apply_event`], which deduplicates against rows already
//! present, so an echo of this client's own write is harmless in either
//! arrival order.

pub mod reorder;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{
    Board, Card, CardAssignment, CardPatch, Entity, List, NewBoard, NewCard, NewList, Ordered,
    PositionUpdate,
};
use crate::error::{Result, TavleError};
use crate::notify::NotificationBus;
use crate::remote::{AssignmentApi, ChangeEvent, ChangeFeed, RemoteTable, Scope, Session};

/// In-memory ordered collection for one entity type, kept in step with one
/// remote table.
pub struct EntityStore<E: Entity> {
    remote: Arc<dyn RemoteTable<E>>,
    session: Option<Arc<dyn Session>>,
    bus: NotificationBus,
    scope: Scope,
    rows: Vec<E>,
    loading: bool,
    error: Option<String>,
}

pub type BoardStore = EntityStore<Board>;
pub type ListStore = EntityStore<List>;
pub type CardStore = EntityStore<Card>;

impl<E: Entity> EntityStore<E> {
    pub fn new(remote: Arc<dyn RemoteTable<E>>, scope: Scope, bus: NotificationBus) -> Self {
        Self {
            remote,
            session: None,
            bus,
            scope,
            rows: Vec::new(),
            loading: false,
            error: None,
        }
    }

    /// Attaches a session gate; operations then require a signed-in user.
    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn rows(&self) -> &[E] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Switches to another scope, clearing local state for a fresh fetch.
    /// The caller re-subscribes its change feed alongside.
    pub fn set_scope(&mut self, scope: Scope) {
        if self.scope != scope {
            self.scope = scope;
            self.rows.clear();
            self.error = None;
        }
    }

    /// Opens a change feed matching this store's scope.
    pub fn subscribe(&self) -> ChangeFeed<E> {
        self.remote.subscribe(&self.scope)
    }

    /// Loads the full current set for the scope.
    ///
    /// On failure the prior rows stay untouched and the error is kept for
    /// display. A detached scope resolves to an empty set without error.
    pub async fn fetch(&mut self) -> Result<()> {
        if self.scope.is_detached() {
            self.rows.clear();
            self.loading = false;
            return Ok(());
        }
        if let Some(session) = self.session.clone() {
            if session.current_user().await?.is_none() {
                self.rows.clear();
                self.loading = false;
                return Ok(());
            }
        }
        self.loading = true;
        let result = self.remote.select(&self.scope).await;
        self.loading = false;
        match result {
            Ok(mut rows) => {
                E::sort(&mut rows);
                debug!(rows = rows.len(), "fetched scope");
                self.rows = rows;
                self.error = None;
                Ok(())
            }
            Err(err) => self.fail("fetch", err),
        }
    }

    /// Inserts a draft and merges the created row into local state.
    ///
    /// The new row is visible locally as soon as the call returns; the
    /// change-feed echo of the same insert is deduplicated by id whichever
    /// side lands first. No local mutation happens on failure.
    pub async fn create(&mut self, draft: E::Draft) -> Result<E> {
        if self.scope.is_detached() {
            return self.fail("create", TavleError::NoParentSelected);
        }
        if let Some(session) = self.session.clone() {
            if session.current_user().await?.is_none() {
                return self.fail("create", TavleError::NotAuthenticated);
            }
        }
        let result = self.remote.insert(draft).await;
        match result {
            Ok(row) => {
                self.upsert(row.clone());
                Ok(row)
            }
            Err(err) => self.fail("create", err),
        }
    }

    /// Optimistically merges a partial update, then issues the remote call.
    /// A remote failure restores the pre-update rows and raises an error
    /// notification.
    ///
    /// A row not present locally (a cross-scope update) goes straight to the
    /// remote with no local change.
    pub async fn update(&mut self, id: Uuid, patch: E::Patch) -> Result<()> {
        let snapshot = if self.rows.iter().any(|row| row.id() == id) {
            let prior = self.rows.clone();
            if let Some(row) = self.rows.iter_mut().find(|row| row.id() == id) {
                row.apply(&patch);
            }
            E::sort(&mut self.rows);
            Some(prior)
        } else {
            None
        };

        let result = self.remote.update(id, patch).await;
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(prior) = snapshot {
                    self.rows = prior;
                }
                self.fail("update", err)
            }
        }
    }

    /// Optimistically removes the row, then issues the remote delete.
    /// A remote failure restores it.
    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        let snapshot = if self.rows.iter().any(|row| row.id() == id) {
            let prior = self.rows.clone();
            self.rows.retain(|row| row.id() != id);
            Some(prior)
        } else {
            None
        };

        let result = self.remote.delete(id).await;
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(prior) = snapshot {
                    self.rows = prior;
                }
                self.fail("delete", err)
            }
        }
    }

    /// Merges one change-feed event. Idempotent: re-delivery of the same
    /// event leaves state unchanged, and events carry full row snapshots so
    /// arrival order does not matter.
    ///
    /// An update for a row not yet present is taken as an insert: the feed
    /// only delivers events for this store's scope, so such a row has just
    /// moved into it (a card moved to this list, for example).
    pub fn apply_event(&mut self, event: ChangeEvent<E>) {
        match event {
            ChangeEvent::Inserted(row) => {
                if !self.rows.iter().any(|r| r.id() == row.id()) {
                    self.rows.push(row);
                    E::sort(&mut self.rows);
                }
            }
            ChangeEvent::Updated(row) => {
                self.upsert(row);
            }
            ChangeEvent::Deleted(row) => {
                self.rows.retain(|r| r.id() != row.id());
            }
        }
    }

    /// Applies every event already queued on the feed.
    pub fn drain(&mut self, feed: &mut ChangeFeed<E>) {
        while let Some(event) = feed.try_recv() {
            self.apply_event(event);
        }
    }

    fn upsert(&mut self, row: E) {
        if let Some(existing) = self.rows.iter_mut().find(|r| r.id() == row.id()) {
            *existing = row;
        } else {
            self.rows.push(row);
        }
        E::sort(&mut self.rows);
    }

    fn fail<T>(&mut self, operation: &'static str, err: TavleError) -> Result<T> {
        let message = err.to_string();
        warn!(operation, error = %message, "store operation failed");
        self.error = Some(message.clone());
        self.bus.error(message);
        Err(err)
    }
}

impl<E: Ordered> EntityStore<E> {
    /// The position a newly created row takes: one past the current maximum,
    /// or zero in an empty scope.
    pub fn next_order_index(&self) -> u32 {
        self.rows
            .iter()
            .map(|row| row.order_index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Applies a reorder batch optimistically, then dispatches it as one
    /// atomic remote call. On failure the prior positions are restored and a
    /// single aggregate error notification is raised.
    pub async fn reorder(&mut self, batch: Vec<PositionUpdate>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let prior = self.rows.clone();
        for update in &batch {
            if let Some(row) = self.rows.iter_mut().find(|row| row.id() == update.id) {
                row.set_order_index(update.order_index);
            }
        }
        E::sort(&mut self.rows);
        debug!(rows = batch.len(), "dispatching reorder batch");

        let result = self.remote.update_positions(&batch).await;
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                self.rows = prior;
                self.fail("reorder", err)
            }
        }
    }
}

impl BoardStore {
    /// Creates a board owned by the current session user.
    pub async fn create_board(
        &mut self,
        title: impl Into<String>,
        description: Option<String>,
        color: Option<String>,
    ) -> Result<Board> {
        let Some(session) = self.session.clone() else {
            return self.fail("create", TavleError::NotAuthenticated);
        };
        let Some(user_id) = session.current_user().await? else {
            return self.fail("create", TavleError::NotAuthenticated);
        };
        self.create(NewBoard {
            title: title.into(),
            description,
            color,
            user_id,
        })
        .await
    }
}

impl ListStore {
    /// Creates a list at the end of the scoped board.
    pub async fn create_list(&mut self, title: impl Into<String>) -> Result<List> {
        let Some(board_id) = self.scope.parent() else {
            return self.fail("create", TavleError::NoParentSelected);
        };
        let draft = NewList {
            board_id,
            title: title.into(),
            order_index: self.next_order_index(),
        };
        self.create(draft).await
    }
}

impl CardStore {
    /// Creates a card at the end of the scoped list.
    pub async fn create_card(
        &mut self,
        title: impl Into<String>,
        description: Option<String>,
        start_date: Option<DateTime<Utc>>,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Card> {
        let Some(list_id) = self.scope.parent() else {
            return self.fail("create", TavleError::NoParentSelected);
        };
        let draft = NewCard {
            list_id,
            title: title.into(),
            description,
            start_date,
            due_date,
            order_index: self.next_order_index(),
        };
        self.create(draft).await
    }

    /// Moves a card to another list. The card leaves this scope immediately;
    /// the destination scope receives it from its own change feed.
    pub async fn move_to_list(
        &mut self,
        card_id: Uuid,
        list_id: Uuid,
        order_index: u32,
    ) -> Result<()> {
        let patch = CardPatch {
            list_id: Some(list_id),
            order_index: Some(order_index),
            ..Default::default()
        };
        let result = self.remote.update(card_id, patch).await;
        match result {
            Ok(()) => {
                self.rows.retain(|card| card.id != card_id);
                Ok(())
            }
            Err(err) => self.fail("move", err),
        }
    }
}

/// Pass-through to the per-card assignment table, with failures surfaced on
/// the notification bus like every other remote call.
pub struct Assignments {
    api: Arc<dyn AssignmentApi>,
    bus: NotificationBus,
}

impl Assignments {
    pub fn new(api: Arc<dyn AssignmentApi>, bus: NotificationBus) -> Self {
        Self { api, bus }
    }

    pub async fn for_card(&self, card_id: Uuid) -> Result<Vec<CardAssignment>> {
        self.surface(self.api.assignments(card_id).await)
    }

    pub async fn assign(&self, card_id: Uuid, user_id: Uuid) -> Result<CardAssignment> {
        self.surface(self.api.assign(card_id, user_id).await)
    }

    pub async fn unassign(&self, card_id: Uuid, user_id: Uuid) -> Result<()> {
        self.surface(self.api.unassign(card_id, user_id).await)
    }

    fn surface<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.bus.error(err.to_string());
        }
        result
    }
}
