#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the pkgqa package audit library
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone for easier handling across the
//! event channel boundary.

use thiserror::Error;

pub mod check;
pub mod package;

// Re-export all error types at the root
pub use check::CheckError;
pub use package::PackageError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("check error: {0}")]
    Check(#[from] CheckError),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// True when the error is a fatal tool-missing condition for a check
    #[must_use]
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Self::Check(CheckError::ToolMissing { .. }))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

/// Result type alias for pkgqa operations
pub type Result<T> = std::result::Result<T, Error>;
