//! # Anomo Service Worker
//!
//! The cache worker behind Anomo World: it keeps the application shell
//! available offline, groups incoming push messages into one notification per
//! tag, and routes notification clicks back into the app.
//!
//! ## Features
//!
//! - **Registration**: register, deploy a new version, `ready`, unregister
//! - **Lifecycle**: atomic install from a fixed manifest, activation with
//!   stale-cache cleanup
//! - **Fetch**: network-first for navigations, cache-first with write-through
//!   for everything else
//! - **Push**: per-tag grouping with aggregate counts and `renotify`
//! - **Notification click**: chat deep link or the notification's own URL
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerContainer (navigator.serviceWorker)
//!     │
//!     ├── ServiceWorkerRegistration
//!     │       ├── installing / waiting / active (ServiceWorker)
//!     │       └── PushManager ── PushSubscription
//!     │
//!     └── CacheWorker (active script context, one per scope)
//!             ├── CacheStorage ── Cache ── CacheEntry
//!             ├── NotificationTray ── Notification
//!             └── Clients ── Client
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub mod cache;
pub mod clients;
pub mod container;
pub mod notifications;
pub mod push;
pub mod registration;
pub mod worker;

pub use cache::{Cache, CacheEntry, CacheStorage};
pub use clients::{Client, Clients};
pub use container::{Capabilities, ServiceWorkerContainer, ServiceWorkerEvent};
pub use notifications::{Notification, NotificationId, NotificationOptions, NotificationTray};
pub use push::{PushEncryptionKeyName, PushManager, PushSubscription, PushSubscriptionOptions};
pub use registration::{ServiceWorker, ServiceWorkerRegistration};
pub use worker::{
    grouped_copy, resolve_click_target, CacheWorker, FetchEvent, FetchResponse, ResponseSource,
};

// ==================== Errors ====================

/// Errors that can occur in service worker operations.
#[derive(Error, Debug, Clone)]
pub enum ServiceWorkerError {
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Push error: {0}")]
    PushError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

// ==================== Types ====================

/// Unique identifier for a service worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Service worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceWorkerState {
    /// Initial state, script being parsed.
    #[default]
    Parsed,
    /// Installing (install event).
    Installing,
    /// Installed but waiting for activation.
    Installed,
    /// Activating (activate event).
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Redundant (replaced or install failed).
    Redundant,
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
