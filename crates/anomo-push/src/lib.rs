//! # Anomo Push
//!
//! Keeps a user's browser push subscription and their remote settings row in
//! step, and sends pushes through the hosted dispatch function.
//!
//! ## Architecture
//!
//! ```text
//! SubscriptionManager
//!     ├── PushPlatform      (ServiceWorkerContainer: register, ready, pushManager)
//!     ├── IdentityProvider  (SessionIdentity: current user)
//!     └── SettingsStore     (RestSettingsStore: settings.push_subscription)
//!
//! ChatNotifier
//!     ├── SettingsStore     (recipient's stored subscription)
//!     └── PushDispatcher    (POST functions/v1/send-push-notification)
//! ```
//!
//! The manager's public operations never fail: they log and return `false`.
//! The `try_*` variants expose the underlying [`PushError`].

pub mod backend;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod manager;
pub mod platform;
pub mod settings;
pub mod subscription;

pub use backend::BackendClient;
pub use dispatch::{ChatNotifier, PushDispatcher};
pub use error::{PushError, PushResult};
pub use identity::{IdentityProvider, SessionIdentity};
pub use manager::SubscriptionManager;
pub use platform::PushPlatform;
pub use settings::{RestSettingsStore, SettingsStore};
pub use subscription::stored_subscription;
