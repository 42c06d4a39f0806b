/// Unified error handling for the runtime API client
///
/// Every failure carries enough context (locator, command text, backend and
/// server names, raw response bytes) to diagnose it without re-running the
/// command against the load balancer.

use crate::core::ServerState;
use bytes::Bytes;
use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for runtime API operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration errors, including malformed socket locators
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The admin socket could not be dialed
    #[error("Unable to connect to {locator}: {source}")]
    Connection {
        locator: String,
        #[source]
        source: io::Error,
    },

    /// The command could not be fully written
    #[error("Unable to send command '{command}': {source}")]
    Write {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The response could not be fully drained
    #[error("Unable to read response to '{command}': {source}")]
    Read {
        command: String,
        #[source]
        source: io::Error,
    },

    /// `show servers state` answered with a version this client does not know
    #[error("Unsupported show servers state version: {found:?} (expected \"1\")")]
    UnsupportedVersion { found: String },

    /// A positional field failed to parse as its declared type
    #[error("Line {line}, column {column} ({name}): cannot decode {value:?}: {reason}")]
    FieldParse {
        line: usize,
        column: usize,
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A row carries fewer columns than the table layout defines
    #[error("Line {line}: expected at least {expected} columns, found {found}")]
    MissingColumns {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A row could not be split into fields
    #[error("Line {line}: malformed row: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A state change was not acknowledged with a single line feed
    #[error("Changing {backend}/{server} to {state} failed with: {}", String::from_utf8_lossy(.response))]
    StateChangeAck {
        backend: String,
        server: String,
        state: ServerState,
        response: Bytes,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Address [{0}] must start with unix:// or tcp://")]
    InvalidLocator(String),
}

/// Result type alias for runtime API operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Check if a higher layer may retry the operation.
    ///
    /// Only transport failures qualify; decode and acknowledgement failures
    /// would fail the same way again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RuntimeError::Connection { .. } | RuntimeError::Write { .. } | RuntimeError::Read { .. }
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RuntimeError::Config(_) => ErrorSeverity::Critical,
            RuntimeError::UnsupportedVersion { .. } => ErrorSeverity::Critical,
            RuntimeError::Connection { .. } => ErrorSeverity::Warning,
            RuntimeError::Write { .. } => ErrorSeverity::Warning,
            RuntimeError::Read { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Errors that need an operator to change something before retrying
    Critical,
    /// Errors that failed the current operation
    Error,
    /// Transient problems a retry may clear
    Warning,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
        }
    }
}
