//! In-memory implementation of the remote contracts.
//!
//! Functional stand-in for the hosted backend: every successful mutation is
//! echoed to the matching change feeds, the same way the real change feed
//! reports this client's own writes back to it. One-shot failure injection
//! makes rollback paths testable.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{
    Board, BoardPatch, Card, CardAssignment, CardPatch, Entity, List, ListPatch, NewBoard, NewCard,
    NewList, Ordered, PositionUpdate,
};
use crate::error::{Result, TavleError};
use crate::remote::{AssignmentApi, ChangeEvent, ChangeFeed, RemoteTable, Scope, Session};

struct TableState<E: Entity> {
    rows: Vec<E>,
    subscribers: Vec<(Scope, mpsc::UnboundedSender<ChangeEvent<E>>)>,
}

impl<E: Entity> Default for TableState<E> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            subscribers: Vec::new(),
        }
    }
}

impl<E: Entity> TableState<E> {
    fn in_scope(scope: &Scope, row: &E, owner: Option<Uuid>) -> bool {
        match scope {
            Scope::Owner => owner.is_some() && row.parent_id() == owner,
            Scope::Parent(parent) => row.parent_id() == Some(*parent),
            Scope::Parents(parents) => row.parent_id().is_some_and(|p| parents.contains(&p)),
            Scope::Detached => false,
        }
    }

    fn select(&self, scope: &Scope, owner: Option<Uuid>) -> Vec<E> {
        let mut rows: Vec<E> = self
            .rows
            .iter()
            .filter(|row| Self::in_scope(scope, row, owner))
            .cloned()
            .collect();
        E::sort(&mut rows);
        rows
    }

    /// Delivers the event to every subscriber whose scope matches the event
    /// row, pruning feeds whose receiving half has been dropped.
    fn publish(&mut self, event: ChangeEvent<E>, owner: Option<Uuid>) {
        self.subscribers.retain(|(scope, tx)| {
            if !Self::in_scope(scope, event.row(), owner) {
                return !tx.is_closed();
            }
            tx.send(event.clone()).is_ok()
        });
    }

    fn subscribe(&mut self, scope: &Scope) -> ChangeFeed<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push((scope.clone(), tx));
        ChangeFeed { rx }
    }
}

impl<E: Ordered> TableState<E> {
    /// All-or-nothing batch position update: validates every id before
    /// touching any row.
    fn apply_positions(&mut self, batch: &[PositionUpdate], owner: Option<Uuid>) -> Result<()> {
        for update in batch {
            if !self.rows.iter().any(|row| row.id() == update.id) {
                return Err(TavleError::RowNotFound(update.id));
            }
        }
        let mut events = Vec::with_capacity(batch.len());
        for update in batch {
            if let Some(row) = self.rows.iter_mut().find(|row| row.id() == update.id) {
                row.set_order_index(update.order_index);
                events.push(ChangeEvent::Updated(row.clone()));
            }
        }
        for event in events {
            self.publish(event, owner);
        }
        Ok(())
    }
}

#[derive(Default)]
struct RemoteState {
    user: Option<Uuid>,
    boards: TableState<Board>,
    lists: TableState<List>,
    cards: TableState<Card>,
    assignments: Vec<CardAssignment>,
    fail_next: Option<String>,
}

/// Shared in-process remote. Cheap to clone; all clones see the same tables.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: Uuid) -> Self {
        let remote = Self::new();
        remote.sign_in(user);
        remote
    }

    pub fn sign_in(&self, user: Uuid) {
        self.lock().user = Some(user);
    }

    pub fn sign_out(&self) {
        self.lock().user = None;
    }

    /// Makes the next remote call fail with `message`. One-shot.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().expect("remote state poisoned")
    }

    fn check_failure(state: &mut RemoteState) -> Result<()> {
        match state.fail_next.take() {
            Some(message) => Err(TavleError::Remote(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteTable<Board> for InMemoryRemote {
    async fn select(&self, scope: &Scope) -> Result<Vec<Board>> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        Ok(state.boards.select(scope, owner))
    }

    async fn insert(&self, draft: NewBoard) -> Result<Board> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        let row = draft.into_row(Utc::now());
        state.boards.rows.push(row.clone());
        state.boards.publish(ChangeEvent::Inserted(row.clone()), owner);
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: BoardPatch) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        let updated = match state.boards.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.apply(&patch);
                row.updated_at = Utc::now();
                row.clone()
            }
            None => return Ok(()),
        };
        state.boards.publish(ChangeEvent::Updated(updated), owner);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        if let Some(idx) = state.boards.rows.iter().position(|row| row.id == id) {
            let old = state.boards.rows.remove(idx);
            state.boards.publish(ChangeEvent::Deleted(old), owner);
        }
        Ok(())
    }

    fn subscribe(&self, scope: &Scope) -> ChangeFeed<Board> {
        self.lock().boards.subscribe(scope)
    }
}

#[async_trait]
impl RemoteTable<List> for InMemoryRemote {
    async fn select(&self, scope: &Scope) -> Result<Vec<List>> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        Ok(state.lists.select(scope, owner))
    }

    async fn insert(&self, draft: NewList) -> Result<List> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        let row = draft.into_row(Utc::now());
        state.lists.rows.push(row.clone());
        state.lists.publish(ChangeEvent::Inserted(row.clone()), owner);
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: ListPatch) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        let updated = match state.lists.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.apply(&patch);
                row.updated_at = Utc::now();
                row.clone()
            }
            None => return Ok(()),
        };
        state.lists.publish(ChangeEvent::Updated(updated), owner);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        if let Some(idx) = state.lists.rows.iter().position(|row| row.id == id) {
            let old = state.lists.rows.remove(idx);
            state.lists.publish(ChangeEvent::Deleted(old), owner);
        }
        Ok(())
    }

    async fn update_positions(&self, batch: &[PositionUpdate]) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        state.lists.apply_positions(batch, owner)
    }

    fn subscribe(&self, scope: &Scope) -> ChangeFeed<List> {
        self.lock().lists.subscribe(scope)
    }
}

#[async_trait]
impl RemoteTable<Card> for InMemoryRemote {
    async fn select(&self, scope: &Scope) -> Result<Vec<Card>> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        Ok(state.cards.select(scope, owner))
    }

    async fn insert(&self, draft: NewCard) -> Result<Card> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        let row = draft.into_row(Utc::now());
        state.cards.rows.push(row.clone());
        state.cards.publish(ChangeEvent::Inserted(row.clone()), owner);
        Ok(row)
    }

    /// An update that changes `list_id` is delivered to feeds matching the
    /// new row, so the destination scope picks the card up and the source
    /// scope hears nothing (it already removed the card optimistically).
    async fn update(&self, id: Uuid, patch: CardPatch) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        let updated = match state.cards.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.apply(&patch);
                row.updated_at = Utc::now();
                row.clone()
            }
            None => return Ok(()),
        };
        state.cards.publish(ChangeEvent::Updated(updated), owner);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        if let Some(idx) = state.cards.rows.iter().position(|row| row.id == id) {
            let old = state.cards.rows.remove(idx);
            state.cards.publish(ChangeEvent::Deleted(old), owner);
        }
        Ok(())
    }

    async fn update_positions(&self, batch: &[PositionUpdate]) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        let owner = state.user;
        state.cards.apply_positions(batch, owner)
    }

    fn subscribe(&self, scope: &Scope) -> ChangeFeed<Card> {
        self.lock().cards.subscribe(scope)
    }
}

#[async_trait]
impl Session for InMemoryRemote {
    async fn current_user(&self) -> Result<Option<Uuid>> {
        Ok(self.lock().user)
    }
}

#[async_trait]
impl AssignmentApi for InMemoryRemote {
    async fn assignments(&self, card_id: Uuid) -> Result<Vec<CardAssignment>> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.card_id == card_id)
            .cloned()
            .collect())
    }

    async fn assign(&self, card_id: Uuid, user_id: Uuid) -> Result<CardAssignment> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        if let Some(existing) = state
            .assignments
            .iter()
            .find(|a| a.card_id == card_id && a.user_id == user_id)
        {
            return Ok(existing.clone());
        }
        let assignment = CardAssignment {
            id: Uuid::new_v4(),
            card_id,
            user_id,
            created_at: Utc::now(),
        };
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn unassign(&self, card_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        state
            .assignments
            .retain(|a| !(a.card_id == card_id && a.user_id == user_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_draft(board_id: Uuid, title: &str, order_index: u32) -> NewList {
        NewList {
            board_id,
            title: title.to_string(),
            order_index,
        }
    }

    #[tokio::test]
    async fn test_select_filters_by_parent_scope() {
        let remote = InMemoryRemote::new();
        let board_a = Uuid::new_v4();
        let board_b = Uuid::new_v4();
        let _: List = remote.insert(list_draft(board_a, "a0", 0)).await.unwrap();
        let _: List = remote.insert(list_draft(board_b, "b0", 0)).await.unwrap();

        let rows: Vec<List> = remote.select(&Scope::Parent(board_a)).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "a0");
    }

    #[tokio::test]
    async fn test_parents_scope_spans_multiple_lists() {
        let remote = InMemoryRemote::new();
        let board_a = Uuid::new_v4();
        let board_b = Uuid::new_v4();
        let board_c = Uuid::new_v4();
        let _: List = remote.insert(list_draft(board_a, "a", 0)).await.unwrap();
        let _: List = remote.insert(list_draft(board_b, "b", 0)).await.unwrap();
        let _: List = remote.insert(list_draft(board_c, "c", 0)).await.unwrap();

        let rows: Vec<List> = remote
            .select(&Scope::Parents(vec![board_a, board_c]))
            .await
            .unwrap();

        let titles: Vec<&str> = rows.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_owner_scope_filters_boards_by_session_user() {
        let user = Uuid::new_v4();
        let remote = InMemoryRemote::with_user(user);
        let draft = NewBoard {
            title: "Mine".to_string(),
            description: None,
            color: None,
            user_id: user,
        };
        let _: Board = remote.insert(draft).await.unwrap();

        let rows: Vec<Board> = remote.select(&Scope::Owner).await.unwrap();
        assert_eq!(rows.len(), 1);

        remote.sign_out();
        let rows: Vec<Board> = remote.select(&Scope::Owner).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_echo_to_matching_feed() {
        let remote = InMemoryRemote::new();
        let board_id = Uuid::new_v4();
        let mut feed: ChangeFeed<List> = remote.subscribe(&Scope::Parent(board_id));

        let row: List = remote.insert(list_draft(board_id, "a", 0)).await.unwrap();
        match feed.recv().await.unwrap() {
            ChangeEvent::Inserted(l) => assert_eq!(l.id, row.id),
            other => panic!("expected insert echo, got {:?}", other),
        }

        RemoteTable::<List>::delete(&remote, row.id).await.unwrap();
        match feed.recv().await.unwrap() {
            ChangeEvent::Deleted(l) => assert_eq!(l.id, row.id),
            other => panic!("expected delete echo, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_feed_outside_scope_hears_nothing() {
        let remote = InMemoryRemote::new();
        let mut feed: ChangeFeed<List> = remote.subscribe(&Scope::Parent(Uuid::new_v4()));

        let _: List = remote
            .insert(list_draft(Uuid::new_v4(), "elsewhere", 0))
            .await
            .unwrap();

        assert!(feed.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_update_positions_is_all_or_nothing() {
        let remote = InMemoryRemote::new();
        let board_id = Uuid::new_v4();
        let a: List = remote.insert(list_draft(board_id, "a", 0)).await.unwrap();

        let batch = vec![
            PositionUpdate {
                id: a.id,
                order_index: 5,
            },
            PositionUpdate {
                id: Uuid::new_v4(),
                order_index: 0,
            },
        ];
        let err = RemoteTable::<List>::update_positions(&remote, &batch)
            .await
            .unwrap_err();
        assert!(matches!(err, TavleError::RowNotFound(_)));

        // The valid entry must not have been applied.
        let rows: Vec<List> = remote.select(&Scope::Parent(board_id)).await.unwrap();
        assert_eq!(rows[0].order_index, 0);
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let remote = InMemoryRemote::new();
        remote.fail_next("connection reset");

        let err = RemoteTable::<List>::select(&remote, &Scope::Parent(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, TavleError::Remote(_)));

        assert!(RemoteTable::<List>::select(&remote, &Scope::Parent(Uuid::new_v4()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_assignments_round_trip() {
        let remote = InMemoryRemote::new();
        let card_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let a = remote.assign(card_id, user_id).await.unwrap();
        // Assigning the same pair again returns the existing row.
        let b = remote.assign(card_id, user_id).await.unwrap();
        assert_eq!(a.id, b.id);

        assert_eq!(remote.assignments(card_id).await.unwrap().len(), 1);

        remote.unassign(card_id, user_id).await.unwrap();
        assert!(remote.assignments(card_id).await.unwrap().is_empty());
    }
}
