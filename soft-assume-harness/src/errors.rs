//! Error types for the harness.

use thiserror::Error;

/// Errors that can occur while preparing a run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Error reading the expected-failures manifest.
    #[error("failed to load manifest: {path}: {message}")]
    Load { path: String, message: String },

    /// The manifest is not valid TOML.
    #[error("failed to parse manifest: {path}: {message}")]
    Parse { path: String, message: String },
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, HarnessError>;
