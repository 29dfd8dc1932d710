//! # Transport Layer
//!
//! Command sessions a [`MemoryStream`](crate::memory::MemoryStream) can drive.
//!
//! ## Implementations
//! - **TCP**: [`TcpCommandSession`], the debug monitor's text command port
//! - **Memory**: [`MemorySession`], a byte-array backed stand-in with fault injection

pub mod memory;
pub mod session;
pub mod tcp;

pub use memory::{Fault, MemorySession};
pub use session::{CommandSession, ConnectionOptions};
pub use tcp::TcpCommandSession;
