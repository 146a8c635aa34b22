//! Translates drag-end gestures into dense position reassignments.
//!
//! Every plan reassigns `order_index = position` across the whole affected
//! sequence, zero-based, regardless of prior values, so a single reorder
//! heals any drift the collection picked up earlier.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::status::{classify, transition, CardStatus, StatusGroups};
use crate::domain::{Card, CardPatch, Ordered, PositionUpdate};

/// A drag-end signal from the gesture layer: the dragged row and whatever it
/// was dropped onto, or `None` for a drop outside any valid target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEnd {
    pub dragged: Uuid,
    pub over: Option<DropTarget>,
}

/// What a drag ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Another row of the same sortable collection.
    Row(Uuid),
    /// A status column zone.
    Status(CardStatus),
}

/// The batches resulting from a drag across status groups.
#[derive(Debug, Clone)]
pub struct StatusMovePlan {
    /// Status-defining field update for the dragged card, applied before
    /// either reorder batch.
    pub transition: CardPatch,
    /// Dense reassignment of the destination group with the dragged card
    /// spliced in at the target position.
    pub destination: Vec<PositionUpdate>,
    /// Dense re-compaction of the group the card left.
    pub source: Vec<PositionUpdate>,
}

/// Outcome of a drag within the status-column view.
#[derive(Debug, Clone)]
pub enum DragOutcome {
    /// Reorder within one status group.
    Reorder(Vec<PositionUpdate>),
    /// Move across status groups.
    Move(StatusMovePlan),
}

/// Moves the element at `from` to `to` and reassigns every position densely.
///
/// Returns the full batch for the collection; an out-of-range `from` yields
/// an empty batch.
pub fn plan_move<E: Ordered>(rows: &[E], from: usize, to: usize) -> Vec<PositionUpdate> {
    let mut ids: Vec<Uuid> = rows.iter().map(|row| row.id()).collect();
    if from >= ids.len() {
        return Vec::new();
    }
    let id = ids.remove(from);
    ids.insert(to.min(ids.len()), id);
    ids.into_iter()
        .enumerate()
        .map(|(index, id)| PositionUpdate {
            id,
            order_index: index as u32,
        })
        .collect()
}

/// Resolves a drag within one sortable collection to a reorder batch.
///
/// Returns `None` for drops outside any target, onto the dragged row itself,
/// onto a status zone, or involving rows not in the collection.
pub fn resolve_drag<E: Ordered>(rows: &[E], drag: &DragEnd) -> Option<Vec<PositionUpdate>> {
    let over = match drag.over {
        Some(DropTarget::Row(id)) => id,
        _ => return None,
    };
    if over == drag.dragged {
        return None;
    }
    let from = rows.iter().position(|row| row.id() == drag.dragged)?;
    let to = rows.iter().position(|row| row.id() == over)?;
    Some(plan_move(rows, from, to))
}

/// Resolves a drag within the status-column view.
///
/// A drop on a row of the same group is a plain reorder. A drop on another
/// group (its zone or one of its rows) yields a [`StatusMovePlan`]: the
/// status transition for the dragged card, the destination group reassigned
/// with the card spliced in, and the source group re-compacted.
pub fn plan_status_drag(
    cards: &[Card],
    drag: &DragEnd,
    now: DateTime<Utc>,
) -> Option<DragOutcome> {
    let card = cards.iter().find(|c| c.id == drag.dragged)?;
    let current = classify(card, now);
    let groups = StatusGroups::group(cards, now);

    match drag.over {
        None => None,
        Some(DropTarget::Status(target)) => {
            if target == current {
                return None;
            }
            let dest = groups.get(target);
            Some(DragOutcome::Move(build_move(
                card,
                dest,
                dest.len(),
                groups.get(current),
                target,
                now,
            )))
        }
        Some(DropTarget::Row(over_id)) => {
            if over_id == drag.dragged {
                return None;
            }
            let over = cards.iter().find(|c| c.id == over_id)?;
            let over_status = classify(over, now);
            if over_status == current {
                let group = groups.get(current);
                let from = group.iter().position(|c| c.id == drag.dragged)?;
                let to = group.iter().position(|c| c.id == over_id)?;
                Some(DragOutcome::Reorder(plan_move(group, from, to)))
            } else {
                let dest = groups.get(over_status);
                let insert_at = dest.iter().position(|c| c.id == over_id)?;
                Some(DragOutcome::Move(build_move(
                    card,
                    dest,
                    insert_at,
                    groups.get(current),
                    over_status,
                    now,
                )))
            }
        }
    }
}

fn build_move(
    card: &Card,
    dest: &[Card],
    insert_at: usize,
    source: &[Card],
    target: CardStatus,
    now: DateTime<Utc>,
) -> StatusMovePlan {
    let mut dest_ids: Vec<Uuid> = dest.iter().map(|c| c.id).collect();
    dest_ids.insert(insert_at.min(dest_ids.len()), card.id);
    let destination = dest_ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| PositionUpdate {
            id,
            order_index: index as u32,
        })
        .collect();

    let source = source
        .iter()
        .filter(|c| c.id != card.id)
        .enumerate()
        .map(|(index, c)| PositionUpdate {
            id: c.id,
            order_index: index as u32,
        })
        .collect();

    StatusMovePlan {
        transition: transition(card, target, now),
        destination,
        source,
    }
}
