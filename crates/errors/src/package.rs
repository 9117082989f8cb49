//! Package adapter error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PackageError {
    #[error("file not found in package: {path}")]
    FileNotFound { path: String },

    #[error("failed to read {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("invalid content digest: {message}")]
    InvalidDigest { message: String },
}
