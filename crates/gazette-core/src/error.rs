//! Error types for the gazette toolkit.
//!
//! Per-issue and per-job failures are recoverable by design: the audit walk
//! and the batch executor record them and keep going. Only a handful of
//! setup-time errors (missing archive root, empty archive) abort a run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for gazette operations.
#[derive(Debug, Error)]
pub enum GazetteError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Catalog returned unexpected status {status} for {url}")]
    CatalogStatus { url: String, status: u16 },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Zero-length file: {0}")]
    ZeroLength(PathBuf),

    #[error("Archive root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("No page files found under {0}")]
    NoPagesFound(PathBuf),

    // Issue metadata errors
    #[error("Issue metadata file missing: {0}")]
    MetadataMissing(PathBuf),

    #[error("Malformed issue metadata at {path}: {message}")]
    MetadataInvalid { path: PathBuf, message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Batch execution errors
    #[error("Failed to spawn {program}: {message}")]
    JobSpawn { program: String, message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for gazette operations.
pub type Result<T> = std::result::Result<T, GazetteError>;

// Conversion implementations for common error types

impl From<std::io::Error> for GazetteError {
    fn from(err: std::io::Error) -> Self {
        GazetteError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for GazetteError {
    fn from(err: serde_json::Error) -> Self {
        GazetteError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for GazetteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GazetteError::Timeout(Duration::from_secs(0))
        } else {
            GazetteError::Network {
                message: err.to_string(),
                cause: err.url().map(|u| u.to_string()),
            }
        }
    }
}

impl GazetteError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        GazetteError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GazetteError::Network { .. } | GazetteError::Timeout(_)
        )
    }

    /// True for errors that mean "the thing is absent" rather than broken.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GazetteError::FileNotFound(_))
    }
}
