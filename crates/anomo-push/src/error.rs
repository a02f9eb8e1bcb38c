//! Error types for push subscription management

use anomo_common::AnomoError;
use anomo_core::CoreError;
use anomo_net::NetError;
use anomo_sw::ServiceWorkerError;
use thiserror::Error;

/// Result type alias for push operations
pub type PushResult<T> = Result<T, PushError>;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Push notifications are not supported")]
    Unsupported,

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Worker registration failed: {0}")]
    Registration(String),

    #[error("Push subscription failed: {0}")]
    Subscription(String),

    #[error("Identity lookup failed: {0}")]
    Identity(String),

    #[error("Settings update failed: {0}")]
    Settings(String),

    #[error("Dispatch failed with status {status}: {body}")]
    Dispatch { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error(transparent)]
    Common(#[from] AnomoError),

    #[error(transparent)]
    Net(#[from] NetError),
}

impl From<ServiceWorkerError> for PushError {
    fn from(err: ServiceWorkerError) -> Self {
        match err {
            ServiceWorkerError::NotSupported(_) => Self::Unsupported,
            ServiceWorkerError::RegistrationFailed(_) | ServiceWorkerError::InstallFailed(_) => {
                Self::Registration(err.to_string())
            }
            other => Self::Subscription(other.to_string()),
        }
    }
}

impl PushError {
    /// Whether the operation ran out of time rather than failed outright.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Common(AnomoError::Timeout(_)))
    }
}
