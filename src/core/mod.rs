//! # Core Protocol Components
//!
//! Wire-level building blocks shared by the memory stream and the sessions.
//!
//! ## Components
//! - **Chunk**: lazy planning of bounded, contiguous transfer pieces
//! - **Command**: typed debug-monitor commands and their text form
//! - **Response**: `NNN- text` status lines
//! - **Codec**: Tokio codec for framing commands, status lines and binary payloads
//!
//! ## Wire Format
//! ```text
//! -> getmem2 addr=0x00010000 length=1024\r\n
//! <- 203- binary response follows\r\n
//! <- [1024 raw bytes]
//! -> setmem addr=0x00010000 data=DEADBEEF\r\n
//! <- 200- set 4 bytes\r\n
//! ```

pub mod chunk;
pub mod codec;
pub mod command;
pub mod response;
