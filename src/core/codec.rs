//! Framing for the debug monitor's command channel.
//!
//! Outbound, each [`Command`] becomes one `\r\n`-terminated text line.
//! Inbound, the channel carries status lines, except right after a
//! `203- binary response follows` acknowledgement when it carries a raw
//! payload of a length only the caller knows. The session announces that
//! length with [`ResponseCodec::expect_binary`] before polling for it.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::Write;
use tokio_util::codec::{Decoder, Encoder};

use crate::core::command::{Command, MAX_COMMAND_LINE};
use crate::core::response::StatusLine;
use crate::error::{constants, MemoryError, Result};

/// Longest status line accepted before the buffer is considered corrupt
pub const MAX_STATUS_LINE: usize = 512;

/// A decoded inbound unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Status(StatusLine),
    Binary(Bytes),
}

#[derive(Debug, Default)]
pub struct ResponseCodec {
    pending_binary: Option<usize>,
}

impl ResponseCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next `len` bytes as a single binary frame
    pub fn expect_binary(&mut self, len: usize) {
        self.pending_binary = Some(len);
    }

    pub fn is_expecting_binary(&self) -> bool {
        self.pending_binary.is_some()
    }
}

impl Decoder for ResponseCodec {
    type Item = Frame;
    type Error = MemoryError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(len) = self.pending_binary {
            if src.len() < len {
                src.reserve(len - src.len());
                return Ok(None);
            }
            self.pending_binary = None;
            return Ok(Some(Frame::Binary(src.split_to(len).freeze())));
        }

        let Some(end) = src.windows(2).position(|pair| pair == b"\r\n") else {
            if src.len() > MAX_STATUS_LINE {
                return Err(MemoryError::MalformedResponse(
                    constants::ERR_STATUS_LINE_TOO_LONG.to_string(),
                ));
            }
            return Ok(None);
        };

        let line = src.split_to(end + 2);
        let text = std::str::from_utf8(&line[..end])
            .map_err(|e| MemoryError::MalformedResponse(format!("status line is not UTF-8: {e}")))?;

        StatusLine::parse(text).map(|status| Some(Frame::Status(status)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && self.pending_binary.is_none() => Ok(None),
            // Peer hung up mid-line or mid-payload
            None => Err(MemoryError::ConnectionClosed),
        }
    }
}

impl Encoder<Command> for ResponseCodec {
    type Error = MemoryError;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        write!(dst, "{command}")
            .map_err(|e| MemoryError::InvalidArgument(format!("cannot format command: {e}")))?;
        dst.put_slice(b"\r\n");

        let line_len = dst.len() - start;
        if line_len > MAX_COMMAND_LINE {
            dst.truncate(start);
            return Err(MemoryError::InvalidArgument(format!(
                "{} command line is {line_len} bytes (maximum: {MAX_COMMAND_LINE})",
                command.name()
            )));
        }

        Ok(())
    }
}
