//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application. [`init_logging`] is the stock way to do that
//! from a [`LoggingConfig`].

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{MemoryError, Result};

/// Build the filter: `RUST_LOG` wins when set, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_ascii_lowercase()))
}

/// Install a global fmt subscriber described by `config`
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if !config.log_to_console {
        return Ok(());
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true);

    let installed = if config.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| MemoryError::ConfigError(format!("Failed to install logger: {e}")))?;
    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
