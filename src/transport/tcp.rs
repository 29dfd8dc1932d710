//! # TCP Command Session
//!
//! Talks to a debug monitor over its text command port.
//!
//! The session owns a [`Framed`] TCP stream using [`ResponseCodec`]. Each
//! command is one line out and one status line back; `getmem2` additionally
//! leaves a binary payload on the wire that [`read_exact`](CommandSession::read_exact)
//! consumes.
//!
//! Transport failures (I/O errors, timeouts, malformed responses, peer hang-up)
//! leave the byte stream at an unknown position, so the session drops the
//! connection and reports `ConnectionClosed` for every later call. A 4xx status
//! keeps the connection usable.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

use crate::config::ConnectionConfig;
use crate::core::codec::{Frame, ResponseCodec};
use crate::core::command::Command;
use crate::core::response::{status, StatusLine};
use crate::error::{constants, MemoryError, Result};
use crate::transport::session::{CommandSession, ConnectionOptions};
use crate::utils::timeout::with_timeout_error;

pub struct TcpCommandSession {
    framed: Option<Framed<TcpStream, ResponseCodec>>,
    options: ConnectionOptions,
    send_timeout: Duration,
    recv_timeout: Duration,
}

impl TcpCommandSession {
    /// Connect and consume the `201- connected` banner
    #[instrument(skip(config), fields(address = %config.address))]
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let address = config.address.clone();
        let stream = with_timeout_error(
            async { Ok(TcpStream::connect(address.as_str()).await?) },
            config.connect_timeout,
        )
        .await?;
        stream.set_nodelay(true)?;

        let mut session = Self {
            framed: Some(Framed::new(stream, ResponseCodec::new())),
            options: ConnectionOptions::from(config),
            send_timeout: config.send_timeout,
            recv_timeout: config.receive_timeout,
        };

        let banner = session.guarded_status().await?;
        if banner.code != status::CONNECTED {
            session.framed = None;
            return Err(MemoryError::MalformedResponse(format!(
                "expected connection banner, got {banner}"
            )));
        }

        info!(address = %config.address, "Connected to debug monitor");
        Ok(session)
    }

    /// False once the connection was closed or dropped after a transport error
    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Say goodbye and drop the connection
    pub async fn close(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        let result = self.send_command_strict(&Command::Bye).await;
        self.framed = None;
        result.map(|_| ())
    }

    fn framed_mut(&mut self) -> Result<&mut Framed<TcpStream, ResponseCodec>> {
        self.framed.as_mut().ok_or(MemoryError::ConnectionClosed)
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        let send_timeout = self.send_timeout;
        let framed = self.framed_mut()?;
        debug!(timeout_ms = ?send_timeout.as_millis(), %command, "Sending command");
        with_timeout_error(framed.send(command.clone()), send_timeout).await
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        let recv_timeout = self.recv_timeout;
        let framed = self.framed_mut()?;
        with_timeout_error(
            async {
                match framed.next().await {
                    Some(frame) => frame,
                    None => Err(MemoryError::ConnectionClosed),
                }
            },
            recv_timeout,
        )
        .await
    }

    async fn receive_status(&mut self) -> Result<StatusLine> {
        match self.next_frame().await? {
            Frame::Status(line) => Ok(line),
            Frame::Binary(_) => Err(MemoryError::MalformedResponse(
                "unexpected binary payload".to_string(),
            )),
        }
    }

    async fn receive_binary(&mut self, len: usize) -> Result<Bytes> {
        self.framed_mut()?.codec_mut().expect_binary(len);
        match self.next_frame().await? {
            Frame::Binary(payload) if payload.len() == len => Ok(payload),
            _ => Err(MemoryError::MalformedResponse(
                constants::ERR_UNEXPECTED_BINARY.to_string(),
            )),
        }
    }

    async fn guarded_status(&mut self) -> Result<StatusLine> {
        let result = self.receive_status().await;
        self.drop_on_transport_error(result)
    }

    fn drop_on_transport_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_transfer_failure() && self.framed.take().is_some() {
                warn!(error = %e, "Dropping debug monitor connection");
            }
        }
        result
    }
}

impl CommandSession for TcpCommandSession {
    #[instrument(skip(self, command), fields(command = command.name()), level = "debug")]
    async fn send_command_strict(&mut self, command: &Command) -> Result<StatusLine> {
        let sent = self.send(command).await;
        self.drop_on_transport_error(sent)?;

        let line = self.guarded_status().await?;
        if !line.is_success() {
            warn!(code = line.code, message = %line.message, "Command rejected");
        }
        line.into_result()
    }

    #[instrument(skip(self, buf), fields(len = buf.len()), level = "debug")]
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let received = self.receive_binary(buf.len()).await;
        let payload = self.drop_on_transport_error(received)?;
        buf.copy_from_slice(&payload);
        Ok(())
    }

    fn receive_timeout(&self) -> Option<Duration> {
        self.framed.as_ref().map(|_| self.recv_timeout)
    }

    fn send_timeout(&self) -> Option<Duration> {
        self.framed.as_ref().map(|_| self.send_timeout)
    }

    fn options(&self) -> ConnectionOptions {
        self.options
    }
}
