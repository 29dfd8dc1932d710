//! Transfer Metrics
//!
//! Counters describing the traffic a memory stream generated.
//!
//! Uses atomic counters so a single [`TransferMetrics`] can be shared through
//! an `Arc` by several streams.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Traffic counters for remote memory transfers
#[derive(Debug)]
pub struct TransferMetrics {
    /// Total chunk commands sent
    pub commands_sent: AtomicU64,
    /// Read chunks that completed
    pub read_chunks: AtomicU64,
    /// Write chunks that completed
    pub write_chunks: AtomicU64,
    /// Bytes pulled from the remote side
    pub bytes_read: AtomicU64,
    /// Bytes committed on the remote side
    pub bytes_written: AtomicU64,
    /// Transfers refused by the protected-mode range check
    pub address_violations: AtomicU64,
    /// Chunks that failed mid-transfer
    pub failed_chunks: AtomicU64,
    start_time: Instant,
}

impl TransferMetrics {
    pub fn new() -> Self {
        Self {
            commands_sent: AtomicU64::new(0),
            read_chunks: AtomicU64::new(0),
            write_chunks: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            address_violations: AtomicU64::new(0),
            failed_chunks: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a chunk command leaving for the remote side
    pub fn command_sent(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed read chunk
    pub fn read_chunk(&self, byte_count: u64) {
        self.read_chunks.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a completed write chunk
    pub fn write_chunk(&self, byte_count: u64) {
        self.write_chunks.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn address_violation(&self) {
        self.address_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn chunk_failed(&self) {
        self.failed_chunks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            read_chunks: self.read_chunks.load(Ordering::Relaxed),
            write_chunks: self.write_chunks.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            address_violations: self.address_violations.load(Ordering::Relaxed),
            failed_chunks: self.failed_chunks.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            commands_sent = snapshot.commands_sent,
            read_chunks = snapshot.read_chunks,
            write_chunks = snapshot.write_chunks,
            bytes_read = snapshot.bytes_read,
            bytes_written = snapshot.bytes_written,
            address_violations = snapshot.address_violations,
            failed_chunks = snapshot.failed_chunks,
            uptime_seconds = snapshot.uptime_seconds,
            "Transfer metrics snapshot"
        );
    }
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub commands_sent: u64,
    pub read_chunks: u64,
    pub write_chunks: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub address_violations: u64,
    pub failed_chunks: u64,
    pub uptime_seconds: u64,
}
