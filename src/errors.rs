//! Error types for configuration loading.
//!
//! Check failures are not errors; see [`crate::failure`] for the aggregated
//! failure raised at the end of a test unit.

use thiserror::Error;

/// Errors that can occur while resolving run settings.
#[derive(Debug, Error)]
pub enum AssumeError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config: {path}: {message}")]
    ReadConfig { path: String, message: String },

    /// The configuration file is not valid TOML for [`crate::Settings`].
    #[error("failed to parse config: {path}: {message}")]
    ParseConfig { path: String, message: String },

    /// An environment override holds a value that cannot be used.
    #[error("invalid value for {var}: {value:?}: {message}")]
    InvalidEnv {
        var: String,
        value: String,
        message: String,
    },
}

/// Result type for configuration operations.
pub type AssumeResult<T> = Result<T, AssumeError>;
