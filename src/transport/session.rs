//! The command session contract a memory stream drives.

use std::future::Future;
use std::time::Duration;

use crate::config::ConnectionConfig;
use crate::core::command::Command;
use crate::core::response::StatusLine;
use crate::error::Result;

/// Options negotiated when the session was opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Streams created over this session start in protected mode
    pub protected_mode: bool,
}

impl From<&ConnectionConfig> for ConnectionOptions {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            protected_mode: config.protected_mode,
        }
    }
}

/// A request/response channel to the remote debug monitor.
///
/// Only one command may be outstanding at a time. After
/// [`send_command_strict`](CommandSession::send_command_strict) acknowledges a
/// `getmem2`, the payload must be pulled with
/// [`read_exact`](CommandSession::read_exact) before the next command is sent.
///
/// A session that has lost its connection answers every call with
/// [`MemoryError::ConnectionClosed`](crate::error::MemoryError::ConnectionClosed).
pub trait CommandSession {
    /// Send `command` and wait for its status line.
    ///
    /// Non-success statuses are returned as
    /// [`MemoryError::ProtocolFailure`](crate::error::MemoryError::ProtocolFailure).
    fn send_command_strict(
        &mut self,
        command: &Command,
    ) -> impl Future<Output = Result<StatusLine>> + Send;

    /// Fill `buf` with raw bytes from the response payload
    fn read_exact(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<()>> + Send;

    /// Response timeout, `None` while disconnected
    fn receive_timeout(&self) -> Option<Duration>;

    /// Send timeout, `None` while disconnected
    fn send_timeout(&self) -> Option<Duration>;

    fn options(&self) -> ConnectionOptions;
}
