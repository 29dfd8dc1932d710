//! # Chunk Planning
//!
//! Splits a transfer of arbitrary length into protocol-sized pieces.
//!
//! A [`Chunks`] iterator yields one [`Chunk`] per remote command. Chunks are
//! produced lazily, in address order, and always tile the requested range
//! exactly: each chunk starts where the previous one ended and the last one
//! ends at `address + total`.
//!
//! ## Sizes
//! - Reads: [`READ_CHUNK_SIZE`] bytes per `getmem2`
//! - Writes: [`WRITE_CHUNK_SIZE`] bytes per `setmem`, since the payload travels
//!   as hex text (two characters per byte) and the remote command line is
//!   bounded by [`MAX_COMMAND_LINE`](crate::core::command::MAX_COMMAND_LINE)

use std::iter::FusedIterator;
use std::ops::Range;

/// Maximum bytes requested by a single read command
pub const READ_CHUNK_SIZE: usize = 1024;

/// Maximum bytes carried by a single write command
pub const WRITE_CHUNK_SIZE: usize = 240;

/// One remote command's worth of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Remote address of the first byte
    pub address: i64,
    /// Offset of the first byte within the caller's buffer
    pub offset: usize,
    /// Number of bytes in this chunk
    pub len: usize,
}

impl Chunk {
    /// Remote address one past the last byte
    pub fn end_address(&self) -> i64 {
        self.address + self.len as i64
    }

    /// Slice range of this chunk within the caller's buffer
    pub fn buffer_range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Lazy sequence of chunks covering `[address, address + total)`
///
/// The caller guarantees `address + total` fits in an `i64`.
#[derive(Debug, Clone)]
pub struct Chunks {
    address: i64,
    offset: usize,
    total: usize,
    chunk_size: usize,
}

impl Chunks {
    /// Plan `total` bytes starting at `address` in pieces of at most `chunk_size`.
    ///
    /// A `chunk_size` of zero is treated as one.
    pub fn new(address: i64, total: usize, chunk_size: usize) -> Self {
        Self {
            address,
            offset: 0,
            total,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Plan a read using [`READ_CHUNK_SIZE`]
    pub fn read(address: i64, total: usize) -> Self {
        Self::new(address, total, READ_CHUNK_SIZE)
    }

    /// Plan a write using [`WRITE_CHUNK_SIZE`]
    pub fn write(address: i64, total: usize) -> Self {
        Self::new(address, total, WRITE_CHUNK_SIZE)
    }

    fn remaining(&self) -> usize {
        self.total - self.offset
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.offset >= self.total {
            return None;
        }

        let len = self.chunk_size.min(self.remaining());
        let chunk = Chunk {
            address: self.address + self.offset as i64,
            offset: self.offset,
            len,
        };
        self.offset += len;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.remaining().div_ceil(self.chunk_size);
        (count, Some(count))
    }
}

impl ExactSizeIterator for Chunks {}

impl FusedIterator for Chunks {}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(chunks: Chunks) -> Vec<usize> {
        chunks.map(|c| c.len).collect()
    }

    #[test]
    fn test_read_plan_splits_at_block_size() {
        assert_eq!(lengths(Chunks::read(0x10000, 2500)), vec![1024, 1024, 452]);
    }

    #[test]
    fn test_write_plan_splits_at_line_limit() {
        assert_eq!(lengths(Chunks::write(0x10000, 500)), vec![240, 240, 20]);
    }

    #[test]
    fn test_empty_transfer_has_no_chunks() {
        let mut chunks = Chunks::read(0x10000, 0);
        assert_eq!(chunks.len(), 0);
        assert_eq!(chunks.next(), None);
    }

    #[test]
    fn test_chunks_are_contiguous() {
        let chunks: Vec<Chunk> = Chunks::write(0x8001_0000, 1000).collect();
        assert_eq!(chunks[0].address, 0x8001_0000);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_address(), pair[1].address);
            assert_eq!(pair[0].buffer_range().end, pair[1].offset);
        }
        assert_eq!(chunks.last().map(Chunk::end_address), Some(0x8001_0000 + 1000));
    }

    #[test]
    fn test_exact_multiple_has_no_tail() {
        assert_eq!(lengths(Chunks::read(0, 2048)), vec![1024, 1024]);
        assert_eq!(Chunks::write(0, 480).len(), 2);
    }

    #[test]
    fn test_zero_chunk_size_still_progresses() {
        assert_eq!(lengths(Chunks::new(0, 3, 0)), vec![1, 1, 1]);
    }
}
