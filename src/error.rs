//! # Error Types
//!
//! Error handling for remote memory access.
//!
//! Every failure a caller can observe from a [`MemoryStream`](crate::memory::MemoryStream)
//! or a [`CommandSession`](crate::transport::CommandSession) is a variant of
//! [`MemoryError`].
//!
//! ## Error Categories
//! - **Safety**: a protected-mode range check rejected the target addresses
//! - **Protocol**: the remote side answered a command with a non-success status
//! - **Transport**: I/O failures, timeouts and dropped connections mid-chunk
//! - **Surface**: operations a remote address space cannot support
//!
//! None of these are retried internally. Bytes moved by chunks that completed
//! before a failure stay moved.
//!
//! ## Example Usage
//! ```rust
//! use remote_memory_stream::error::{MemoryError, Result};
//!
//! fn checked_end(start: i64, count: usize) -> Result<i64> {
//!     i64::try_from(count)
//!         .ok()
//!         .and_then(|count| start.checked_add(count))
//!         .ok_or_else(|| MemoryError::InvalidArgument(format!("range overflows at {start:#x}")))
//! }
//!
//! assert!(checked_end(i64::MAX, 1).is_err());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Unsupported surface
    pub const ERR_FLUSH_UNSUPPORTED: &str = "flush";
    pub const ERR_LENGTH_UNSUPPORTED: &str = "length query";
    pub const ERR_SET_LENGTH_UNSUPPORTED: &str = "set length";
    pub const ERR_SET_READ_TIMEOUT_UNSUPPORTED: &str = "set read timeout";
    pub const ERR_SET_WRITE_TIMEOUT_UNSUPPORTED: &str = "set write timeout";

    /// Argument validation
    pub const ERR_UNSUPPORTED_SEEK_ORIGIN: &str = "unsupported seek origin";
    pub const ERR_NEGATIVE_ADDRESS: &str = "seek would move before address zero";
    pub const ERR_ADDRESS_OVERFLOW: &str = "address arithmetic overflowed";
    pub const ERR_OUTSIDE_ADDRESS_SPACE: &str = "range extends past the 32-bit address space";

    /// Response parsing
    pub const ERR_EMPTY_STATUS_LINE: &str = "empty status line";
    pub const ERR_STATUS_LINE_TOO_LONG: &str = "status line exceeds maximum length";
    pub const ERR_UNEXPECTED_BINARY: &str = "expected binary payload, got status line";
}

/// Primary error type for remote memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid address range detected: {start:#x}..{end:#x}")]
    AddressViolation { start: i64, end: i64 },

    #[error("Command failed with status {code}: {message}")]
    ProtocolFailure { code: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl MemoryError {
    /// True for failures raised while a chunk command was in flight
    pub fn is_transfer_failure(&self) -> bool {
        matches!(
            self,
            MemoryError::ProtocolFailure { .. }
                | MemoryError::MalformedResponse(_)
                | MemoryError::Io(_)
                | MemoryError::Timeout
                | MemoryError::ConnectionClosed
        )
    }
}

impl From<tokio::time::error::Elapsed> for MemoryError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        MemoryError::Timeout
    }
}

/// Type alias for Results using MemoryError
pub type Result<T> = std::result::Result<T, MemoryError>;
