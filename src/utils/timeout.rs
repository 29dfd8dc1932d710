//! Timeout helpers for session I/O.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Default send/receive timeout for a command round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default budget for establishing the TCP connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Run a fallible future, mapping an elapsed deadline to [`MemoryError::Timeout`]
pub async fn with_timeout_error<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(duration, future).await?
}
