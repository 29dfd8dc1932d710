//! Typed debug-monitor commands and their wire text.

use std::fmt;

/// Longest command line the remote side accepts, terminator included
pub const MAX_COMMAND_LINE: usize = 512;

/// Highest address the 8-digit `addr=` field carries
pub const MAX_ADDRESS: i64 = 0xFFFF_FFFF;

/// A command understood by the remote debug monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read `length` bytes starting at `address`; answered with a binary payload
    GetMem2 { address: i64, length: usize },
    /// Write hex-encoded `data` starting at `address`
    SetMem { address: i64, data: String },
    /// Close the command channel
    Bye,
}

impl Command {
    pub fn get_mem(address: i64, length: usize) -> Self {
        Command::GetMem2 { address, length }
    }

    /// Build a `setmem` command, hex-encoding `bytes`
    pub fn set_mem(address: i64, bytes: &[u8]) -> Self {
        Command::SetMem {
            address,
            data: hex::encode_upper(bytes),
        }
    }

    /// Command keyword as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetMem2 { .. } => "getmem2",
            Command::SetMem { .. } => "setmem",
            Command::Bye => "bye",
        }
    }

    /// Length of the wire line including the `\r\n` terminator
    pub fn line_len(&self) -> usize {
        self.to_string().len() + 2
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetMem2 { address, length } => {
                write!(f, "getmem2 addr=0x{address:08x} length={length}")
            }
            Command::SetMem { address, data } => write!(f, "setmem addr=0x{address:08x} data={data}"),
            Command::Bye => f.write_str("bye"),
        }
    }
}
