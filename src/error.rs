//! Error types for Seawatch
//!
//! Link errors never leave the link state machine; they are recorded in the
//! unit's [`LinkStatus`](crate::link::LinkStatus) and the loop falls back to
//! simulated data. Configuration errors are the only ones surfaced to callers.

use thiserror::Error;

/// Result type alias for Seawatch operations
pub type Result<T> = std::result::Result<T, SeawatchError>;

/// Main error type for Seawatch operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeawatchError {
    /// Serial link error
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a serial link or port provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    /// No port enumerated and no fallback configured
    #[error("No serial port available")]
    NoPortAvailable,

    /// Port enumeration failed
    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    /// Port could not be opened
    #[error("Failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// Read or write failure on an open port
    #[error("I/O error on {port}: {reason}")]
    Io { port: String, reason: String },

    /// Operation on a closed link
    #[error("Link closed")]
    Closed,
}

/// Errors in engine or unit configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value is out of its allowed domain
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Configuration file could not be read
    #[error("Cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    /// Configuration document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
