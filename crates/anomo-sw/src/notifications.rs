//! Notification tray.
//!
//! The tray is owned by the platform, not by any worker: it outlives worker
//! suspensions, and the user can dismiss entries at any time. Workers must
//! therefore re-read it rather than remember what they showed.

use anomo_core::NotificationData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::ServiceWorkerError;

/// Unique identifier for a shown notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

impl NotificationId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Options for `showNotification`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    /// Grouping key; a new notification replaces any shown one with the same tag.
    pub tag: Option<String>,
    /// Alert the user again even when replacing a same-tag notification.
    pub renotify: bool,
    pub data: Option<NotificationData>,
}

/// A notification currently in the tray.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    /// Scope of the registration that showed it.
    pub scope: String,
    pub title: String,
    pub options: NotificationOptions,
    /// Whether showing it alerted the user (sound/vibration).
    pub alerted: bool,
    pub shown_at: Instant,
}

impl Notification {
    pub fn tag(&self) -> Option<&str> {
        self.options.tag.as_deref()
    }
}

/// The OS notification tray.
#[derive(Debug, Default)]
pub struct NotificationTray {
    shown: RwLock<Vec<Notification>>,
}

impl NotificationTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a notification.
    pub async fn show(
        &self,
        scope: &str,
        title: impl Into<String>,
        options: NotificationOptions,
    ) -> Result<NotificationId, ServiceWorkerError> {
        if options.renotify && options.tag.as_deref().map_or(true, str::is_empty) {
            return Err(ServiceWorkerError::NotificationError(
                "renotify requires a non-empty tag".to_string(),
            ));
        }

        let mut shown = self.shown.write().await;

        let replaced = match options.tag.as_deref() {
            Some(tag) => {
                let before = shown.len();
                shown.retain(|n| !(n.scope == scope && n.tag() == Some(tag)));
                before != shown.len()
            }
            None => false,
        };

        let notification = Notification {
            id: NotificationId::new(),
            scope: scope.to_string(),
            title: title.into(),
            alerted: !replaced || options.renotify,
            options,
            shown_at: Instant::now(),
        };
        let id = notification.id;

        debug!(
            title = %notification.title,
            tag = ?notification.tag(),
            replaced,
            alerted = notification.alerted,
            "Notification shown"
        );
        shown.push(notification);
        Ok(id)
    }

    /// Notifications of a scope, optionally filtered by tag, oldest first.
    pub async fn get_notifications(&self, scope: &str, tag: Option<&str>) -> Vec<Notification> {
        self.shown
            .read()
            .await
            .iter()
            .filter(|n| n.scope == scope)
            .filter(|n| tag.map_or(true, |t| n.tag() == Some(t)))
            .cloned()
            .collect()
    }

    /// Look up a notification by ID.
    pub async fn get(&self, id: NotificationId) -> Option<Notification> {
        self.shown.read().await.iter().find(|n| n.id == id).cloned()
    }

    /// Close a notification. Closing an already-closed one is a no-op.
    pub async fn close(&self, id: NotificationId) -> bool {
        let mut shown = self.shown.write().await;
        let before = shown.len();
        shown.retain(|n| n.id != id);
        let closed = before != shown.len();
        trace!(?id, closed, "Notification close");
        closed
    }

    /// User dismissed a notification from the tray.
    pub async fn dismiss(&self, id: NotificationId) -> bool {
        self.close(id).await
    }

    pub async fn len(&self) -> usize {
        self.shown.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shown.read().await.is_empty()
    }
}
