//! # Tavle Core
//!
//! Core domain logic and remote-state synchronization for Tavle task boards.
//!
//! This crate keeps per-scope collections of boards, lists, and cards in step
//! with a hosted data store: mutations apply optimistically and roll back on
//! remote failure, while change-feed events merge in idempotently by row id.
//! The remote store itself (persistence, authorization, change-feed delivery)
//! is a black-box collaborator behind the traits in [`remote`].

pub mod domain;
pub mod error;
pub mod notify;
pub mod remote;
pub mod store;

// Re-export commonly used types
pub use domain::{
    board::{Board, BoardPatch, NewBoard},
    card::{Card, CardAssignment, CardPatch, NewCard},
    list::{List, ListPatch, NewList},
    status::{classify, transition, CardStatus, StatusColumn, StatusGroups},
    Entity, Ordered, PositionUpdate,
};
pub use error::{Result, TavleError};
pub use notify::{Notification, NotificationBus, NotificationStream, Severity};
pub use remote::{
    AssignmentApi, ChangeEvent, ChangeFeed, InMemoryRemote, RemoteTable, Scope, Session,
};
pub use store::{
    reorder::{
        plan_move, plan_status_drag, resolve_drag, DragEnd, DragOutcome, DropTarget,
        StatusMovePlan,
    },
    Assignments, BoardStore, CardStore, EntityStore, ListStore,
};
