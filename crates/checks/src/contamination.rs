//! Build contamination check
//!
//! Scans raw file bytes for two kinds of build-time artifacts: the date
//! (and possibly clock time) the package was built on, and the path of the
//! build staging directory. Both make package content depend on when and
//! where it was built instead of what it was built from.

use async_trait::async_trait;
use regex::bytes;
use regex::Regex;

use pkgqa_errors::{CheckError, Error};
use pkgqa_events::{AppEvent, CheckEvent, EventEmitter, EventSender};
use pkgqa_types::{DiagnosticCode, Package, Severity};

use crate::traits::FileCheck;

const DEBUG_INFO_PREFIX: &str = "/usr/lib/debug";

/// Permissive `H:MM:SS` / `HH:MM:SS` clock-time shape
const CLOCK_PATTERN: &str = r"(2[0-3]|[01]?[0-9]):([0-5]?[0-9]):([0-5]?[0-9])";

/// Bounded wildcard standing in for a package name/version/release; the
/// `!-.` range admits the punctuation that shows up in version strings,
/// `+` and `.` included
const MACRO_CLASS: &str = r"[\w!-.]{1,20}";

/// Scans file content for embedded build dates and staging-path leaks
pub struct BuildContaminationCheck {
    filter: Regex,
    clock_re: bytes::Regex,
    /// Today's date captured once at construction; a run that crosses
    /// midnight keeps the start-of-run date
    today_re: bytes::Regex,
    buildroot_re: bytes::Regex,
    event_sender: Option<EventSender>,
}

impl BuildContaminationCheck {
    /// Create the check from a build-staging path template
    ///
    /// The template contains `%{name}` / `%{version}` / `%{release}`
    /// placeholders (upper- or lowercase), each replaced with a bounded
    /// wildcard before the whole path is compiled as a byte pattern.
    ///
    /// # Errors
    /// Returns an error if the template yields an invalid pattern.
    pub fn new(
        buildroot_template: &str,
        event_sender: Option<EventSender>,
    ) -> Result<Self, Error> {
        let today = chrono::Local::now().format("%b %e %Y").to_string();

        Ok(Self {
            filter: Regex::new(".*").map_err(pattern_error)?,
            clock_re: bytes::Regex::new(CLOCK_PATTERN).map_err(pattern_error)?,
            today_re: bytes::Regex::new(&regex::escape(&today)).map_err(pattern_error)?,
            buildroot_re: bytes::Regex::new(&buildroot_pattern(buildroot_template))
                .map_err(pattern_error)?,
            event_sender,
        })
    }

    fn emit_finding(&self, package: &dyn Package, path: &str, code: DiagnosticCode) {
        self.emit(AppEvent::Check(CheckEvent::finding(
            self.name(),
            Severity::Error,
            package.name(),
            code,
            path,
        )));
    }
}

#[async_trait]
impl FileCheck for BuildContaminationCheck {
    fn name(&self) -> &'static str {
        "build-contamination"
    }

    fn path_filter(&self) -> &Regex {
        &self.filter
    }

    async fn check_file(&self, package: &dyn Package, path: &str) -> Result<(), Error> {
        if path.starts_with(DEBUG_INFO_PREFIX) || package.is_source() {
            return Ok(());
        }
        let Some(entry) = package.file(path) else {
            return Ok(());
        };
        if !entry.mode.is_regular() {
            return Ok(());
        }

        let Ok(content) = package.mapped(path) else {
            return Ok(());
        };
        if content.is_empty() {
            return Ok(());
        }

        if self.today_re.is_match(&content) {
            if self.clock_re.is_match(&content) {
                self.emit_finding(package, path, DiagnosticCode::FileContainsDateAndTime);
            } else {
                self.emit_finding(package, path, DiagnosticCode::FileContainsCurrentDate);
            }
        }
        if self.buildroot_re.is_match(&content) {
            self.emit_finding(package, path, DiagnosticCode::FileContainsBuildroot);
        }
        Ok(())
    }
}

impl EventEmitter for BuildContaminationCheck {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Turn a staging path template into a byte pattern: literal segments are
/// escaped, macro placeholders become bounded wildcards
fn buildroot_pattern(template: &str) -> String {
    let mut pattern = regex::escape(template);
    for name in ["name", "version", "release", "NAME", "VERSION", "RELEASE"] {
        let placeholder = regex::escape(&format!("%{{{name}}}"));
        pattern = pattern.replace(&placeholder, MACRO_CLASS);
    }
    pattern
}

fn pattern_error(e: regex::Error) -> Error {
    CheckError::PatternError {
        message: e.to_string(),
    }
    .into()
}
