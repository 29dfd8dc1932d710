//! Status lines returned by the debug monitor.
//!
//! Every response starts with a line of the form `NNN- text`. Codes in the
//! 2xx range acknowledge the command; 4xx codes report a failure.

use crate::error::{constants, MemoryError, Result};

/// Status codes used by the debug monitor
pub mod status {
    pub const OK: u16 = 200;
    pub const CONNECTED: u16 = 201;
    pub const MULTILINE_FOLLOWS: u16 = 202;
    pub const BINARY_FOLLOWS: u16 = 203;
    pub const SEND_BINARY: u16 = 204;
    pub const NOTIFICATION_CHANNEL: u16 = 205;

    pub const UNEXPECTED_ERROR: u16 = 400;
    pub const MEMORY_NOT_MAPPED: u16 = 404;
    pub const UNKNOWN_COMMAND: u16 = 407;
}

/// Parsed `NNN- text` response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    pub message: String,
}

impl StatusLine {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Parse a line without its `\r\n` terminator
    pub fn parse(line: &str) -> Result<Self> {
        if line.is_empty() {
            return Err(MemoryError::MalformedResponse(
                constants::ERR_EMPTY_STATUS_LINE.to_string(),
            ));
        }

        let code = line
            .get(..3)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u16>().ok())
            .ok_or_else(|| MemoryError::MalformedResponse(format!("bad status code in {line:?}")))?;

        let rest = &line[3..];
        let message = rest.strip_prefix('-').unwrap_or(rest).trim_start();

        Ok(Self::new(code, message))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Convert a failure status into the matching error
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(MemoryError::ProtocolFailure {
                code: self.code,
                message: self.message,
            })
        }
    }
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}- {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_line() {
        let line = StatusLine::parse("203- binary response follows").unwrap();
        assert_eq!(line.code, status::BINARY_FOLLOWS);
        assert_eq!(line.message, "binary response follows");
        assert!(line.is_success());
    }

    #[test]
    fn test_parse_error_line() {
        let line = StatusLine::parse("404- memory not mapped").unwrap();
        assert!(!line.is_success());
        match line.into_result() {
            Err(MemoryError::ProtocolFailure { code, message }) => {
                assert_eq!(code, 404);
                assert_eq!(message, "memory not mapped");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_bare_code() {
        let line = StatusLine::parse("200-").unwrap();
        assert_eq!(line, StatusLine::new(200, ""));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            StatusLine::parse("hello"),
            Err(MemoryError::MalformedResponse(_))
        ));
        assert!(matches!(
            StatusLine::parse(""),
            Err(MemoryError::MalformedResponse(_))
        ));
        assert!(matches!(
            StatusLine::parse("2x0- ok"),
            Err(MemoryError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let line = StatusLine::new(200, "OK");
        assert_eq!(StatusLine::parse(&line.to_string()).unwrap(), line);
    }
}
