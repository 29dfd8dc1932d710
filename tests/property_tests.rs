//! Property-based tests using proptest
//!
//! These tests check the chunking invariants of the memory stream across
//! randomly generated positions, counts and payloads.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use remote_memory_stream::core::chunk::{Chunks, READ_CHUNK_SIZE, WRITE_CHUNK_SIZE};
use remote_memory_stream::core::command::Command;
use remote_memory_stream::memory::{AllowAll, MemoryStream, SeekOrigin};
use remote_memory_stream::transport::MemorySession;

const BASE: i64 = 0x10000;
const SIZE: usize = 0x8000;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn stream() -> MemoryStream<MemorySession, AllowAll> {
    MemoryStream::new(MemorySession::new(BASE, vec![0; SIZE]), AllowAll)
}

// Property: Chunks tile the requested range with no gaps or overlaps
proptest! {
    #[test]
    fn prop_chunks_tile_range(address in 0i64..0x1_0000_0000, total in 0usize..20_000, size in 1usize..2048) {
        let chunks: Vec<_> = Chunks::new(address, total, size).collect();

        prop_assert_eq!(chunks.len(), total.div_ceil(size));
        let mut expected = address;
        for chunk in &chunks {
            prop_assert_eq!(chunk.address, expected);
            prop_assert!(chunk.len > 0 && chunk.len <= size);
            expected = chunk.end_address();
        }
        prop_assert_eq!(expected, address + total as i64);
    }
}

// Property: A read issues ceil(count / 1024) contiguous getmem2 commands
proptest! {
    #[test]
    fn prop_read_commands_cover_range(offset in 0i64..0x1000, count in 0usize..0x7000) {
        let mut stream = stream();
        stream.seek(BASE + offset, SeekOrigin::Begin).expect("seek");
        let data = block_on(stream.read(count)).expect("read");
        prop_assert_eq!(data.len(), count);

        let commands = stream.session().commands();
        prop_assert_eq!(commands.len(), count.div_ceil(READ_CHUNK_SIZE));

        let mut expected = BASE + offset;
        for command in commands {
            match command {
                Command::GetMem2 { address, length } => {
                    prop_assert_eq!(*address, expected);
                    expected += *length as i64;
                }
                other => prop_assert!(false, "unexpected command {:?}", other),
            }
        }
        prop_assert_eq!(expected, BASE + offset + count as i64);
        prop_assert_eq!(stream.position(), expected);
    }
}

// Property: Hex payloads of the setmem commands concatenate to the written bytes
proptest! {
    #[test]
    fn prop_write_payloads_concatenate(payload in prop::collection::vec(any::<u8>(), 0..3000)) {
        let mut stream = stream();
        let written = block_on(stream.write(&payload)).expect("write");
        prop_assert_eq!(written, payload.len());

        let commands = stream.session().commands();
        prop_assert_eq!(commands.len(), payload.len().div_ceil(WRITE_CHUNK_SIZE));

        let mut decoded = Vec::new();
        let mut expected = BASE;
        for command in commands {
            match command {
                Command::SetMem { address, data } => {
                    prop_assert_eq!(*address, expected);
                    let bytes = hex::decode(data).expect("hex payload");
                    expected += bytes.len() as i64;
                    decoded.extend(bytes);
                }
                other => prop_assert!(false, "unexpected command {:?}", other),
            }
        }
        prop_assert_eq!(decoded, payload);
    }
}

// Property: Seeking relative to the cursor composes additively
proptest! {
    #[test]
    fn prop_seek_current_adds(start in 0i64..0x1_0000_0000, delta in -0x1000i64..0x1000) {
        let mut stream = stream();
        stream.seek(start, SeekOrigin::Begin).expect("seek begin");
        let result = stream.seek(delta, SeekOrigin::Current);

        if start + delta >= 0 {
            prop_assert_eq!(result.expect("seek current"), start + delta);
            prop_assert_eq!(stream.position(), start + delta);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(stream.position(), start);
        }
    }
}
