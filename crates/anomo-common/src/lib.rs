//! # Anomo Common
//!
//! Common utilities shared by the Anomo World crates.
//!
//! ## Features
//!
//! - Shared error type for bounded platform and remote operations
//! - Logging configuration and setup
//! - Timeout helper for platform and remote operations

use std::time::Duration;
use thiserror::Error;

pub mod logging;
pub mod timeout;

pub use logging::{init_logging, LogConfig, LogFormat};
pub use timeout::with_timeout;

/// Error type shared across Anomo crates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnomoError {
    /// The operation did not finish within its bound.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for Anomo operations.
pub type Result<T> = std::result::Result<T, AnomoError>;
