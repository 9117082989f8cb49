use serde::{Deserialize, Serialize};

use pkgqa_types::{DiagnosticCode, Severity};

/// Check execution events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CheckEvent {
    /// A check started scanning a package
    ScanStarted {
        check: String,
        package: String,
        files: usize,
    },

    /// A diagnostic produced by a per-file hook
    Finding {
        check: String,
        severity: Severity,
        package: String,
        code: DiagnosticCode,
        path: String,
        detail: Option<String>,
    },

    /// A check finished scanning a package
    ScanCompleted {
        check: String,
        package: String,
        files_matched: usize,
    },

    /// Accumulated external-tool timings, emitted once per check at teardown
    TimingSummary {
        check: String,
        syntax_seconds: f64,
        portability_seconds: f64,
    },

    /// A check aborted with a fatal failure
    CheckFailed { check: String, error: String },
}

impl CheckEvent {
    /// Create a finding event
    #[must_use]
    pub fn finding(
        check: impl Into<String>,
        severity: Severity,
        package: impl Into<String>,
        code: DiagnosticCode,
        path: impl Into<String>,
    ) -> Self {
        Self::Finding {
            check: check.into(),
            severity,
            package: package.into(),
            code,
            path: path.into(),
            detail: None,
        }
    }

    /// Create a finding event with free-text detail
    #[must_use]
    pub fn finding_with_detail(
        check: impl Into<String>,
        severity: Severity,
        package: impl Into<String>,
        code: DiagnosticCode,
        path: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Finding {
            check: check.into(),
            severity,
            package: package.into(),
            code,
            path: path.into(),
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_serializes_with_tags() {
        let event = CheckEvent::finding(
            "shell-portability",
            Severity::Warning,
            "demo",
            DiagnosticCode::PotentialBashisms,
            "/usr/bin/x",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Finding");
        assert_eq!(json["code"], "potential-bashisms");
        assert_eq!(json["severity"], "warning");
    }
}
