//! Anomo Core Library
//!
//! This crate provides configuration, errors, and the JSON wire contracts
//! shared by the cache worker and the push subscription manager.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AnomoConfig, BackendConfig, PushConfig, WorkerConfig};
pub use error::{CoreError, CoreResult};
pub use types::{
    AuthUser, DispatchResponse, NotificationData, PushDispatchRequest, PushPayload,
    SettingsRecord, StoredSubscription, SubscriptionKeys, CHAT_TAG, DEFAULT_TAG,
};
