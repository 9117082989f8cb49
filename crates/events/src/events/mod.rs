use serde::{Deserialize, Serialize};

// Declare all domain modules
pub mod check;
pub mod general;

// Re-export all domain events
pub use check::CheckEvent;
pub use general::GeneralEvent;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, debug notes)
    General(GeneralEvent),

    /// Check execution events (diagnostics, scan lifecycle, summaries)
    Check(CheckEvent),
}
