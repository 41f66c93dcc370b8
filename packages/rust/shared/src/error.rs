//! Error types for bandmerge.
//!
//! Library crates use [`BandMergeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all bandmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum BandMergeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Band file discovery error (bad root folder, unreadable state directory).
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A file could not be opened as a raster layer.
    #[error("invalid raster at {path:?}: {reason}")]
    InvalidRaster { path: PathBuf, reason: String },

    /// The external merge engine failed to run or exited unsuccessfully.
    #[error("merge error: {0}")]
    Merge(String),

    /// Data validation error (bad band list, malformed file name, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BandMergeError>;

impl BandMergeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an invalid-raster error for `path`.
    pub fn invalid_raster(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidRaster {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BandMergeError::config("empty band list");
        assert_eq!(err.to_string(), "config error: empty band list");

        let err = BandMergeError::invalid_raster("/data/AC/x_B4.TIF", "not a TIFF header");
        assert!(err.to_string().contains("x_B4.TIF"));
        assert!(err.to_string().contains("not a TIFF header"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = BandMergeError::io("/data/RJ", source);
        assert!(err.to_string().contains("/data/RJ"));
    }
}
