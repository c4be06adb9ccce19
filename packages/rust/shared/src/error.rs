//! Error types for the BioNLP corpus adapter.
//!
//! Library crates use [`BioNlpError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum BioNlpError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while downloading an archive.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed brat annotation line.
    #[error("parse error in {path:?} line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Corrupt or unreadable archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (dangling reference, schema mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BioNlpError>;

impl BioNlpError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error pointing at a line of an annotation file.
    pub fn parse(path: impl Into<PathBuf>, line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
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
        let err = BioNlpError::config("unknown schema 'foo'");
        assert_eq!(err.to_string(), "config error: unknown schema 'foo'");

        let err = BioNlpError::parse("/data/PMID-1.a2", 7, "event without trigger");
        let msg = err.to_string();
        assert!(msg.contains("PMID-1.a2"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("event without trigger"));
    }
}
