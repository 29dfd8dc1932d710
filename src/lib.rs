//! # Remote Memory Stream
//!
//! Seekable byte-stream access to the memory of a device that is only
//! reachable through a text command/response debug protocol.
//!
//! A [`MemoryStream`] keeps an absolute remote address as its cursor and turns
//! arbitrary-length reads and writes into bounded `getmem2` / `setmem`
//! commands, sent one at a time in address order over a [`CommandSession`].
//! In protected mode every transfer is checked against an
//! [`AddressValidator`] before anything reaches the device.
//!
//! ## Modules
//! - [`memory`]: the stream and address validation
//! - [`transport`]: the session contract, a TCP session and an in-memory session
//! - [`core`]: chunk planning, commands, status lines and the wire codec
//! - [`config`]: TOML/env configuration with validation
//! - [`utils`]: logging, timeouts and transfer metrics
//!
//! ## Example
//! ```no_run
//! use remote_memory_stream::config::DebugConfig;
//! use remote_memory_stream::memory::{MemoryRegion, MemoryStream, RegionMap, SeekOrigin};
//! use remote_memory_stream::transport::TcpCommandSession;
//!
//! # async fn run() -> remote_memory_stream::Result<()> {
//! let config = DebugConfig::from_file("debug.toml")?;
//! let session = TcpCommandSession::connect(&config.connection).await?;
//! let regions = RegionMap::from_regions([MemoryRegion::new(0x10000, 0x10_0000)]);
//!
//! let mut stream = MemoryStream::with_config(session, regions, &config.memory)?;
//! stream.seek(0x10000, SeekOrigin::Begin)?;
//! let header = stream.read(4).await?;
//! assert_eq!(header, b"XBEH");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod memory;
pub mod transport;
pub mod utils;

pub use error::{MemoryError, Result};
pub use memory::{AddressValidator, MemoryStream, SeekOrigin};
pub use transport::CommandSession;
