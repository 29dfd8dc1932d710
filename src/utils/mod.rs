//! # Utility Modules
//!
//! Supporting utilities for logging, timing and observability.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup from [`LoggingConfig`](crate::config::LoggingConfig)
//! - **Timeout**: Async timeout wrappers for session I/O
//! - **Metrics**: Thread-safe transfer counters

pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{MetricsSnapshot, TransferMetrics};
