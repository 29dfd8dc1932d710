//! # Configuration Management
//!
//! Centralized configuration for remote memory access.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Sections
//! - `connection`: where the debug monitor listens, timeouts, protected mode
//! - `memory`: chunk sizes and the stream's starting address
//! - `logging`: subscriber settings used by [`init_logging`](crate::utils::logging::init_logging)

use crate::core::chunk::{READ_CHUNK_SIZE, WRITE_CHUNK_SIZE};
use crate::core::command::{Command, MAX_ADDRESS, MAX_COMMAND_LINE};
use crate::error::{MemoryError, Result};
use crate::memory::stream::XBE_HEADER_ADDRESS;
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default debug monitor port
pub const DEFAULT_PORT: u16 = 731;

/// Whether protected mode is enabled by default
pub const ENABLE_PROTECTED_MODE: bool = true;

/// Upper bound on a single `getmem2` request
pub const MAX_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DebugConfig {
    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Memory stream settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DebugConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("REMOTE_MEMORY_ADDRESS") {
            config.connection.address = addr;
        }

        if let Ok(timeout) = std::env::var("REMOTE_MEMORY_TIMEOUT_MS") {
            let millis = timeout.parse::<u64>().map_err(|e| {
                MemoryError::ConfigError(format!("Invalid REMOTE_MEMORY_TIMEOUT_MS: {e}"))
            })?;
            config.connection.receive_timeout = Duration::from_millis(millis);
            config.connection.send_timeout = Duration::from_millis(millis);
        }

        if let Ok(flag) = std::env::var("REMOTE_MEMORY_PROTECTED_MODE") {
            config.connection.protected_mode = parse_flag(&flag).ok_or_else(|| {
                MemoryError::ConfigError(format!("Invalid REMOTE_MEMORY_PROTECTED_MODE: {flag}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| MemoryError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.connection.validate());
        errors.extend(self.memory.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MemoryError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Debug monitor connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Debug monitor address (e.g., "192.168.1.20:731")
    pub address: String,

    /// Timeout for establishing the connection
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for each response
    #[serde(with = "duration_serde")]
    pub receive_timeout: Duration,

    /// Timeout for each command send
    #[serde(with = "duration_serde")]
    pub send_timeout: Duration,

    /// Validate address ranges before touching remote memory
    pub protected_mode: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{DEFAULT_PORT}"),
            connect_timeout: timeout::CONNECT_TIMEOUT,
            receive_timeout: timeout::DEFAULT_TIMEOUT,
            send_timeout: timeout::DEFAULT_TIMEOUT,
            protected_mode: ENABLE_PROTECTED_MODE,
        }
    }
}

impl ConnectionConfig {
    /// Validate connection configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Connection address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid connection address format: '{}' (expected format: '192.168.1.20:731')",
                self.address
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 60 {
            errors.push("Connect timeout too long (maximum: 60s)".to_string());
        }

        if self.receive_timeout.as_millis() < 10 {
            errors.push("Receive timeout too short (minimum: 10ms)".to_string());
        }

        if self.send_timeout.as_millis() < 10 {
            errors.push("Send timeout too short (minimum: 10ms)".to_string());
        }

        errors
    }
}

/// Memory stream settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Bytes requested per `getmem2`
    pub read_chunk_size: usize,

    /// Bytes carried per `setmem`
    pub write_chunk_size: usize,

    /// Address a new stream starts at
    pub initial_position: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: READ_CHUNK_SIZE,
            write_chunk_size: WRITE_CHUNK_SIZE,
            initial_position: XBE_HEADER_ADDRESS,
        }
    }
}

impl MemoryConfig {
    /// Validate memory configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.read_chunk_size == 0 {
            errors.push("Read chunk size must be greater than 0".to_string());
        } else if self.read_chunk_size > MAX_READ_CHUNK_SIZE {
            errors.push(format!(
                "Read chunk size too large: {} bytes (maximum: {MAX_READ_CHUNK_SIZE})",
                self.read_chunk_size
            ));
        }

        if self.write_chunk_size == 0 {
            errors.push("Write chunk size must be greater than 0".to_string());
        } else {
            // Streams never address past MAX_ADDRESS
            let line = Command::set_mem(MAX_ADDRESS, &vec![0; self.write_chunk_size]).line_len();
            if line > MAX_COMMAND_LINE {
                errors.push(format!(
                    "Write chunk size too large: {} bytes encode to a {line} byte command line (maximum: {MAX_COMMAND_LINE})",
                    self.write_chunk_size
                ));
            }
        }

        if self.initial_position < 0 {
            errors.push(format!(
                "Initial position cannot be negative: {}",
                self.initial_position
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Use the compact single-line formatter
    pub compact: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("remote-memory-stream"),
            log_level: Level::INFO,
            log_to_console: true,
            compact: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
