//! Check execution error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CheckError {
    #[error("external validator not found: {tool}")]
    ToolMissing { tool: String },

    #[error("capability probe of {tool} failed: {message}")]
    ProbeFailed { tool: String, message: String },

    #[error("failed to run {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("invalid selection pattern: {message}")]
    PatternError { message: String },
}
