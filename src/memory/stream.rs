//! # Memory Stream
//!
//! Seekable, chunked byte access to remote memory.
//!
//! A [`MemoryStream`] keeps a cursor holding an absolute remote address and
//! turns each `read`/`write` into a sequence of bounded commands on its
//! [`CommandSession`]:
//!
//! ```text
//! read(2500) at 0x10000
//!   -> getmem2 addr=0x00010000 length=1024
//!   -> getmem2 addr=0x00010400 length=1024
//!   -> getmem2 addr=0x00010800 length=452
//! ```
//!
//! Chunks are sent one at a time, in address order, each waiting for its
//! acknowledgement. The cursor moves after every completed chunk, so when a
//! transfer fails partway the position points just past the last chunk that
//! made it. Nothing is rolled back: a failed write may leave a prefix of its
//! payload committed on the device.
//!
//! With protected mode on, the whole target range is checked against the
//! [`AddressValidator`] before the first command goes out.
//!
//! ## Example
//! ```rust
//! use remote_memory_stream::memory::{AllowAll, MemoryStream, SeekOrigin};
//! use remote_memory_stream::transport::MemorySession;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> remote_memory_stream::Result<()> {
//! let session = MemorySession::new(0x10000, vec![0; 0x4000]);
//! let mut stream = MemoryStream::new(session, AllowAll);
//!
//! stream.seek(0x10100, SeekOrigin::Begin)?;
//! stream.write(b"hello").await?;
//! stream.seek(-5, SeekOrigin::Current)?;
//! assert_eq!(stream.read(5).await?, b"hello");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, trace, warn, Instrument, Span};

use crate::config::MemoryConfig;
use crate::core::chunk::{Chunk, Chunks, READ_CHUNK_SIZE, WRITE_CHUNK_SIZE};
use crate::core::command::{Command, MAX_ADDRESS};
use crate::error::{constants, MemoryError, Result};
use crate::memory::validator::AddressValidator;
use crate::transport::session::CommandSession;
use crate::utils::metrics::TransferMetrics;

/// Address a new stream starts at; the executable header is always mapped
pub const XBE_HEADER_ADDRESS: i64 = 0x10000;

/// Reference point for [`MemoryStream::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Absolute address
    Begin,
    /// Relative to the current position
    Current,
    /// Relative to the end of memory; remote memory has no end, so always rejected
    End,
}

pub struct MemoryStream<S, V> {
    session: S,
    validator: V,
    position: i64,
    protected_mode: bool,
    read_chunk_size: usize,
    write_chunk_size: usize,
    metrics: Option<Arc<TransferMetrics>>,
    span: Span,
}

impl<S, V> MemoryStream<S, V>
where
    S: CommandSession,
    V: AddressValidator,
{
    /// Bind a stream to `session`, starting at [`XBE_HEADER_ADDRESS`].
    ///
    /// Protected mode is taken from the session's connection options.
    pub fn new(session: S, validator: V) -> Self {
        let protected_mode = session.options().protected_mode;
        Self {
            session,
            validator,
            position: XBE_HEADER_ADDRESS,
            protected_mode,
            read_chunk_size: READ_CHUNK_SIZE,
            write_chunk_size: WRITE_CHUNK_SIZE,
            metrics: None,
            span: info_span!("memory_stream"),
        }
    }

    /// Bind a stream using chunk sizes and starting address from `config`.
    ///
    /// Fails with [`MemoryError::ConfigError`] when `config` does not
    /// validate, e.g. a write chunk too large for one command line.
    pub fn with_config(session: S, validator: V, config: &MemoryConfig) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(MemoryError::ConfigError(errors.join("; ")));
        }

        let mut stream = Self::new(session, validator);
        stream.position = config.initial_position;
        stream.read_chunk_size = config.read_chunk_size;
        stream.write_chunk_size = config.write_chunk_size;
        Ok(stream)
    }

    /// Emit this stream's diagnostics under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Count traffic into a shared collector
    pub fn with_metrics(mut self, metrics: Arc<TransferMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current absolute remote address
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Whether transfers are range-checked before any command is sent
    pub fn protected_mode(&self) -> bool {
        self.protected_mode
    }

    /// Turn range checking on or off for later transfers
    pub fn set_protected_mode(&mut self, enabled: bool) {
        self.protected_mode = enabled;
    }

    /// Move the cursor and return the new position.
    ///
    /// Fails without moving when the origin is [`SeekOrigin::End`] or the
    /// result would be negative or overflow.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<i64> {
        let target = match origin {
            SeekOrigin::Begin => Some(offset),
            SeekOrigin::Current => self.position.checked_add(offset),
            SeekOrigin::End => {
                return Err(MemoryError::InvalidArgument(
                    constants::ERR_UNSUPPORTED_SEEK_ORIGIN.to_string(),
                ))
            }
        };

        match target {
            Some(address) if address >= 0 => {
                trace!(parent: &self.span, from = self.position, to = address, "Seek");
                self.position = address;
                Ok(address)
            }
            Some(address) => Err(MemoryError::InvalidArgument(format!(
                "{}: {address}",
                constants::ERR_NEGATIVE_ADDRESS
            ))),
            None => Err(MemoryError::InvalidArgument(
                constants::ERR_ADDRESS_OVERFLOW.to_string(),
            )),
        }
    }

    /// Read `count` bytes at the cursor
    pub async fn read(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_into(&mut buf).await?;
        Ok(buf)
    }

    /// Fill `buf` from the cursor and return the number of bytes read.
    ///
    /// On failure, chunks that completed before the failing one remain in
    /// `buf` and are reflected in [`position`](Self::position).
    pub async fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let span = self.span.clone();
        self.read_chunks(buf).instrument(span).await
    }

    /// Write `data` at the cursor and return the number of bytes written.
    ///
    /// On failure, chunks that completed before the failing one are already
    /// committed remotely and reflected in [`position`](Self::position).
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let span = self.span.clone();
        self.write_chunks(data).instrument(span).await
    }

    async fn read_chunks(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let start = self.position;
        self.check_range(start, buf.len())?;
        debug!(address = start, count = buf.len(), "Reading remote memory");

        for chunk in Chunks::new(start, buf.len(), self.read_chunk_size) {
            let command = Command::get_mem(chunk.address, chunk.len);
            let result = self.read_chunk(&command, &mut buf[chunk.buffer_range()]).await;
            self.finish_chunk(&chunk, result)?;
            if let Some(metrics) = &self.metrics {
                metrics.read_chunk(chunk.len as u64);
            }
        }

        Ok(buf.len())
    }

    async fn read_chunk(&mut self, command: &Command, dest: &mut [u8]) -> Result<()> {
        self.record_command();
        self.session.send_command_strict(command).await?;
        self.session.read_exact(dest).await
    }

    async fn write_chunks(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let start = self.position;
        self.check_range(start, data.len())?;
        debug!(address = start, count = data.len(), "Writing remote memory");

        for chunk in Chunks::new(start, data.len(), self.write_chunk_size) {
            let command = Command::set_mem(chunk.address, &data[chunk.buffer_range()]);
            self.record_command();
            let result = self.session.send_command_strict(&command).await.map(|_| ());
            self.finish_chunk(&chunk, result)?;
            if let Some(metrics) = &self.metrics {
                metrics.write_chunk(chunk.len as u64);
            }
        }

        Ok(data.len())
    }

    /// Advance past a completed chunk, or report where the transfer stopped
    fn finish_chunk(&mut self, chunk: &Chunk, result: Result<()>) -> Result<()> {
        debug_assert_eq!(chunk.address, self.position);
        match result {
            Ok(()) => {
                trace!(address = chunk.address, len = chunk.len, "Chunk complete");
                self.position = chunk.end_address();
                Ok(())
            }
            Err(e) => {
                warn!(
                    address = chunk.address,
                    len = chunk.len,
                    completed = chunk.offset,
                    error = %e,
                    "Chunk failed; transfer aborted"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.chunk_failed();
                }
                Err(e)
            }
        }
    }

    fn check_range(&self, start: i64, count: usize) -> Result<()> {
        let end = i64::try_from(count)
            .ok()
            .and_then(|count| start.checked_add(count))
            .ok_or_else(|| {
                MemoryError::InvalidArgument(format!(
                    "{}: {start:#x} + {count}",
                    constants::ERR_ADDRESS_OVERFLOW
                ))
            })?;

        if end - 1 > MAX_ADDRESS {
            return Err(MemoryError::InvalidArgument(format!(
                "{}: {start:#x}..{end:#x}",
                constants::ERR_OUTSIDE_ADDRESS_SPACE
            )));
        }

        if self.protected_mode && !self.validator.is_valid_address_range(start, end) {
            warn!(start, end, "Protected mode rejected address range");
            if let Some(metrics) = &self.metrics {
                metrics.address_violation();
            }
            return Err(MemoryError::AddressViolation { start, end });
        }

        Ok(())
    }

    fn record_command(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.command_sent();
        }
    }

    /// The session's receive timeout, or zero while disconnected
    pub fn read_timeout(&self) -> Duration {
        self.session.receive_timeout().unwrap_or(Duration::ZERO)
    }

    /// The session's send timeout, or zero while disconnected
    pub fn write_timeout(&self) -> Duration {
        self.session.send_timeout().unwrap_or(Duration::ZERO)
    }

    /// Timeouts belong to the session
    pub fn set_read_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Err(MemoryError::UnsupportedOperation(
            constants::ERR_SET_READ_TIMEOUT_UNSUPPORTED,
        ))
    }

    /// Timeouts belong to the session
    pub fn set_write_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Err(MemoryError::UnsupportedOperation(
            constants::ERR_SET_WRITE_TIMEOUT_UNSUPPORTED,
        ))
    }

    /// Every write chunk is acknowledged before the next one is sent; there is
    /// nothing to flush.
    pub fn flush(&mut self) -> Result<()> {
        Err(MemoryError::UnsupportedOperation(
            constants::ERR_FLUSH_UNSUPPORTED,
        ))
    }

    /// Remote memory has no length
    pub fn len(&self) -> Result<u64> {
        Err(MemoryError::UnsupportedOperation(
            constants::ERR_LENGTH_UNSUPPORTED,
        ))
    }

    /// Remote memory cannot be resized
    pub fn set_len(&mut self, _len: u64) -> Result<()> {
        Err(MemoryError::UnsupportedOperation(
            constants::ERR_SET_LENGTH_UNSUPPORTED,
        ))
    }
}

impl<S, V> MemoryStream<S, V> {
    /// The bound command session
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Mutable access to the session, e.g. to close it
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// The range validator used in protected mode
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Unbind the stream, returning its session and validator
    pub fn into_parts(self) -> (S, V) {
        (self.session, self.validator)
    }
}

impl<S, V> std::fmt::Debug for MemoryStream<S, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStream")
            .field("position", &format_args!("{:#x}", self.position))
            .field("protected_mode", &self.protected_mode)
            .field("read_chunk_size", &self.read_chunk_size)
            .field("write_chunk_size", &self.write_chunk_size)
            .finish_non_exhaustive()
    }
}
