//! Timeout helper.
//!
//! Platform and remote calls can hang forever (a worker that never activates,
//! a stalled fetch), so callers bound them explicitly. There is no retry: a
//! timed-out operation is reported once and recovery waits for the next event.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::AnomoError;

/// Run an operation with a timeout.
pub async fn with_timeout<T, F, Fut>(timeout: Duration, operation: F) -> crate::Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    tokio::time::timeout(timeout, operation())
        .await
        .map_err(|_| {
            warn!(?timeout, "Operation timed out");
            AnomoError::Timeout(timeout)
        })
}
