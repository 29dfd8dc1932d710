//! # In-Memory Session
//!
//! A [`CommandSession`] that answers `getmem2`/`setmem` from a local byte
//! array instead of a device. It speaks the same status codes as the real
//! debug monitor, records every command it receives, and can be told to fail
//! a specific command or payload read, which makes it the standard fake for
//! exercising memory streams offline.
//!
//! ```rust
//! use remote_memory_stream::transport::MemorySession;
//!
//! // 64 KiB of zeroed memory mapped at 0x10000
//! let session = MemorySession::new(0x10000, vec![0; 0x10000]);
//! assert_eq!(session.base(), 0x10000);
//! ```

use std::time::Duration;
use tracing::{debug, trace};

use crate::core::command::{Command, MAX_COMMAND_LINE};
use crate::core::response::{status, StatusLine};
use crate::error::{MemoryError, Result};
use crate::transport::session::{CommandSession, ConnectionOptions};
use crate::utils::timeout::DEFAULT_TIMEOUT;

/// Fault to inject on a given command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer the command with this 4xx status
    Reject(u16),
    /// Acknowledge the command, then time out while the payload is read
    StallPayload,
    /// Drop the connection instead of answering
    Disconnect,
}

/// Byte-array backed debug monitor
#[derive(Debug, Clone)]
pub struct MemorySession {
    base: i64,
    memory: Vec<u8>,
    commands: Vec<Command>,
    staged: Option<Vec<u8>>,
    stall_payload: bool,
    faults: Vec<(usize, Fault)>,
    connected: bool,
    options: ConnectionOptions,
    receive_timeout: Duration,
    send_timeout: Duration,
}

impl MemorySession {
    /// Map `memory` at address `base`
    pub fn new(base: i64, memory: Vec<u8>) -> Self {
        Self {
            base,
            memory,
            commands: Vec::new(),
            staged: None,
            stall_payload: false,
            faults: Vec::new(),
            connected: true,
            options: ConnectionOptions::default(),
            receive_timeout: DEFAULT_TIMEOUT,
            send_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeouts(mut self, send_timeout: Duration, receive_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self.receive_timeout = receive_timeout;
        self
    }

    /// Inject `fault` on the command with zero-based index `index`
    pub fn fail_command(mut self, index: usize, fault: Fault) -> Self {
        self.faults.push((index, fault));
        self
    }

    /// Drop the connection; every later call fails with `ConnectionClosed`
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.staged = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn base(&self) -> i64 {
        self.base
    }

    /// The backing bytes
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Every command received so far, in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    fn span_of(&self, address: i64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.memory.len()).then_some(start..end)
    }

    fn fault_for(&self, index: usize) -> Option<Fault> {
        self.faults
            .iter()
            .find(|(at, _)| *at == index)
            .map(|(_, fault)| *fault)
    }

    fn execute(&mut self, command: &Command) -> StatusLine {
        match command {
            Command::GetMem2 { address, length } => match self.span_of(*address, *length) {
                Some(range) => {
                    self.staged = Some(self.memory[range].to_vec());
                    StatusLine::new(status::BINARY_FOLLOWS, "binary response follows")
                }
                None => StatusLine::new(status::MEMORY_NOT_MAPPED, "memory not mapped"),
            },
            Command::SetMem { address, data } => {
                let Ok(bytes) = hex::decode(data) else {
                    return StatusLine::new(status::UNEXPECTED_ERROR, "bad hex data");
                };
                match self.span_of(*address, bytes.len()) {
                    Some(range) => {
                        self.memory[range].copy_from_slice(&bytes);
                        StatusLine::new(status::OK, format!("set {} bytes", bytes.len()))
                    }
                    None => StatusLine::new(status::MEMORY_NOT_MAPPED, "memory not mapped"),
                }
            }
            Command::Bye => {
                self.connected = false;
                StatusLine::new(status::OK, "bye")
            }
        }
    }
}

impl CommandSession for MemorySession {
    async fn send_command_strict(&mut self, command: &Command) -> Result<StatusLine> {
        if !self.connected {
            return Err(MemoryError::ConnectionClosed);
        }

        // The real codec refuses these before anything reaches the wire
        let line_len = command.line_len();
        if line_len > MAX_COMMAND_LINE {
            return Err(MemoryError::InvalidArgument(format!(
                "{} command line is {line_len} bytes (maximum: {MAX_COMMAND_LINE})",
                command.name()
            )));
        }

        let index = self.commands.len();
        self.commands.push(command.clone());
        self.staged = None;
        self.stall_payload = false;
        trace!(index, %command, "Simulated command");

        match self.fault_for(index) {
            Some(Fault::Reject(code)) => {
                debug!(index, code, "Injected command rejection");
                return StatusLine::new(code, "injected failure").into_result();
            }
            Some(Fault::Disconnect) => {
                debug!(index, "Injected disconnect");
                self.disconnect();
                return Err(MemoryError::ConnectionClosed);
            }
            Some(Fault::StallPayload) => {
                self.stall_payload = matches!(command, Command::GetMem2 { .. });
            }
            None => {}
        }

        self.execute(command).into_result()
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if !self.connected {
            return Err(MemoryError::ConnectionClosed);
        }
        if std::mem::take(&mut self.stall_payload) {
            self.staged = None;
            return Err(MemoryError::Timeout);
        }

        let staged = self.staged.take().ok_or_else(|| {
            MemoryError::MalformedResponse("no binary response pending".to_string())
        })?;
        if staged.len() != buf.len() {
            return Err(MemoryError::MalformedResponse(format!(
                "pending payload is {} bytes, caller asked for {}",
                staged.len(),
                buf.len()
            )));
        }

        buf.copy_from_slice(&staged);
        Ok(())
    }

    fn receive_timeout(&self) -> Option<Duration> {
        self.connected.then_some(self.receive_timeout)
    }

    fn send_timeout(&self) -> Option<Duration> {
        self.connected.then_some(self.send_timeout)
    }

    fn options(&self) -> ConnectionOptions {
        self.options
    }
}
