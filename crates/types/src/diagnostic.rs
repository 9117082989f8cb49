//! Diagnostic severities and codes emitted by checks

use serde::{Deserialize, Serialize};

/// Severity of an emitted diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Warning that should be addressed
    Warning,
    /// Error that must be fixed
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Short identifier classifying a detected packaging defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// Script declared as `/bin/sh` fails the POSIX syntax validator
    BinShSyntaxError,
    /// Script uses constructs outside the POSIX shell dialect
    PotentialBashisms,
    /// An external validator exceeded its bounded wait for one file
    ValidatorTimedOut,
    /// File content embeds the date the package was built on
    FileContainsCurrentDate,
    /// File content embeds both the build date and a clock time
    FileContainsDateAndTime,
    /// File content leaks the build staging directory path
    FileContainsBuildroot,
}

impl DiagnosticCode {
    /// The kebab-case wire string for this code
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BinShSyntaxError => "bin-sh-syntax-error",
            Self::PotentialBashisms => "potential-bashisms",
            Self::ValidatorTimedOut => "validator-timed-out",
            Self::FileContainsCurrentDate => "file-contains-current-date",
            Self::FileContainsDateAndTime => "file-contains-date-and-time",
            Self::FileContainsBuildroot => "file-contains-buildroot",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_wire_strings() {
        assert_eq!(
            DiagnosticCode::BinShSyntaxError.to_string(),
            "bin-sh-syntax-error"
        );
        assert_eq!(
            DiagnosticCode::FileContainsDateAndTime.as_str(),
            "file-contains-date-and-time"
        );
    }

    #[test]
    fn code_serializes_as_kebab_case() {
        let json = serde_json::to_string(&DiagnosticCode::PotentialBashisms).unwrap();
        assert_eq!(json, "\"potential-bashisms\"");

        let back: DiagnosticCode = serde_json::from_str("\"file-contains-buildroot\"").unwrap();
        assert_eq!(back, DiagnosticCode::FileContainsBuildroot);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Error.to_string(), "error");
    }
}
