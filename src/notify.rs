//! Process-wide notification bus for transient user-facing messages.
//!
//! An explicit observable object: subscribers receive the full current list
//! on subscription and again after every change, and unsubscribe by dropping
//! their stream. Expiry is a caller-driven [`NotificationBus::sweep`] rather
//! than a background timer, so it stays deterministic under test.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Severity tag of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// A transient user-facing message. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

struct BusInner {
    items: Vec<Notification>,
    subscribers: Vec<(u64, mpsc::UnboundedSender<Vec<Notification>>)>,
    next_subscriber: u64,
    ttl: Duration,
}

impl BusInner {
    fn publish(&mut self) {
        let items = self.items.clone();
        self.subscribers
            .retain(|(_, tx)| tx.send(items.clone()).is_ok());
    }
}

/// Shared handle to the notification list. Cheap to clone; all clones
/// observe the same list and subscriber set.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<Mutex<BusInner>>,
}

impl NotificationBus {
    /// Notifications expire this long after creation unless dismissed first.
    pub const DEFAULT_TTL_SECONDS: i64 = 5;

    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(Self::DEFAULT_TTL_SECONDS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                items: Vec::new(),
                subscribers: Vec::new(),
                next_subscriber: 0,
                ttl,
            })),
        }
    }

    /// Appends a notification and fans the updated list out to subscribers.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
            created_at: Utc::now(),
        };
        let id = notification.id;
        debug!(severity = ?severity, message = %notification.message, "notification");

        let mut inner = self.inner.lock().expect("notification bus poisoned");
        inner.items.push(notification);
        inner.publish();
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Info)
    }

    /// Removes a notification by id. Unknown ids are ignored.
    pub fn dismiss(&self, id: Uuid) {
        let mut inner = self.inner.lock().expect("notification bus poisoned");
        let before = inner.items.len();
        inner.items.retain(|n| n.id != id);
        if inner.items.len() != before {
            inner.publish();
        }
    }

    /// Drops every notification older than the bus TTL as of `now`.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("notification bus poisoned");
        let ttl = inner.ttl;
        let before = inner.items.len();
        inner.items.retain(|n| now - n.created_at < ttl);
        if inner.items.len() != before {
            inner.publish();
        }
    }

    /// The current notification list.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .expect("notification bus poisoned")
            .items
            .clone()
    }

    /// Registers a subscriber. The stream immediately yields the current
    /// list, then every subsequent change, until it is dropped.
    pub fn subscribe(&self) -> NotificationStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("notification bus poisoned");
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        let _ = tx.send(inner.items.clone());
        inner.subscribers.push((id, tx));
        NotificationStream {
            id,
            bus: Arc::clone(&self.inner),
            rx,
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .expect("notification bus poisoned")
            .subscribers
            .len()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a bus subscription. Dropping it unsubscribes.
pub struct NotificationStream {
    id: u64,
    bus: Arc<Mutex<BusInner>>,
    rx: mpsc::UnboundedReceiver<Vec<Notification>>,
}

impl NotificationStream {
    /// Waits for the next published list.
    pub async fn recv(&mut self) -> Option<Vec<Notification>> {
        self.rx.recv().await
    }

    /// Returns the next published list if one is ready.
    pub fn try_recv(&mut self) -> Option<Vec<Notification>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.bus.lock() {
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_current_list_immediately() {
        let bus = NotificationBus::new();
        bus.info("already here");

        let mut stream = bus.subscribe();
        let list = stream.recv().await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].message, "already here");
    }

    #[tokio::test]
    async fn test_notify_fans_out_to_subscribers() {
        let bus = NotificationBus::new();
        let mut stream = bus.subscribe();
        stream.recv().await.unwrap(); // initial empty list

        bus.error("remote call failed");

        let list = stream.recv().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_dismiss_removes_and_republishes() {
        let bus = NotificationBus::new();
        let id = bus.success("saved");
        let mut stream = bus.subscribe();
        stream.recv().await.unwrap();

        bus.dismiss(id);

        let list = stream.recv().await.unwrap();
        assert!(list.is_empty());
        assert!(bus.snapshot().is_empty());
    }

    #[test]
    fn test_sweep_expires_old_notifications() {
        let bus = NotificationBus::with_ttl(Duration::seconds(5));
        bus.info("stale");
        let now = Utc::now();

        bus.sweep(now + Duration::seconds(10));

        assert!(bus.snapshot().is_empty());
    }

    #[test]
    fn test_sweep_keeps_fresh_notifications() {
        let bus = NotificationBus::with_ttl(Duration::seconds(5));
        bus.info("fresh");

        bus.sweep(Utc::now());

        assert_eq!(bus.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let bus = NotificationBus::new();
        let stream = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(stream);

        assert_eq!(bus.subscriber_count(), 0);
        // Publishing after the drop must not fail.
        bus.info("nobody listening");
    }
}
