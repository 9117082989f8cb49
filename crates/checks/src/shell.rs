//! Shell portability check
//!
//! Runs two external validators against every regular file whose magic
//! descriptor marks it as a POSIX shell script: a syntax check in
//! no-execute mode, then a bashisms scan. Results are cached by content
//! digest, so a script shipped identically in several packages is
//! validated once and its diagnostics replayed everywhere else.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use tokio::sync::OnceCell;

use pkgqa_errors::{CheckError, Error};
use pkgqa_events::{AppEvent, CheckEvent, EventEmitter, EventSender};
use pkgqa_hash::Digest;
use pkgqa_types::{DiagnosticCode, Package, Severity};

use crate::tool::{probe_help, run_tool, ToolExit};
use crate::traits::FileCheck;

const SHELL_MAGIC_PREFIX: &str = "POSIX shell script";
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome of one validation stage for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOutcome {
    Clean,
    Finding(DiagnosticCode),
    TimedOut,
    /// Content is not valid UTF-8; the stage was skipped for this file
    Skipped,
}

/// Validates shell scripts through external syntax and portability tools
pub struct ShellPortabilityCheck {
    filter: Regex,
    syntax_tool: String,
    scanner_tool: String,
    /// Result of the one-time `--help` capability probe
    early_fail: bool,
    timeout: Option<Duration>,
    /// Digest-keyed results; the cell guarantees the pipeline runs at most
    /// once per unique content even under parallel dispatch
    cache: DashMap<Digest, Arc<OnceCell<Vec<DiagnosticCode>>>>,
    syntax_micros: AtomicU64,
    scan_micros: AtomicU64,
    halted: AtomicBool,
    event_sender: Option<EventSender>,
}

impl ShellPortabilityCheck {
    /// Create the check with the default `dash` / `checkbashisms` tools
    ///
    /// # Errors
    /// Returns an error if the portability scanner cannot be probed for
    /// its early-fail capability.
    pub async fn new(event_sender: Option<EventSender>) -> Result<Self, Error> {
        Self::with_tools("dash", "checkbashisms", event_sender).await
    }

    /// Create the check with explicit tool commands
    ///
    /// Probes `scanner_tool --help` once to detect support for the
    /// early-fail flag; the probe result is fixed for the check lifetime.
    ///
    /// # Errors
    /// Returns [`CheckError::ToolMissing`] if the scanner cannot be
    /// spawned, or [`CheckError::ProbeFailed`] for other probe failures.
    pub async fn with_tools(
        syntax_tool: impl Into<String>,
        scanner_tool: impl Into<String>,
        event_sender: Option<EventSender>,
    ) -> Result<Self, Error> {
        let syntax_tool = syntax_tool.into();
        let scanner_tool = scanner_tool.into();

        let help = probe_help(&scanner_tool).await?;
        let early_fail = supports_early_fail(&help);

        Ok(Self {
            filter: match_all_pattern()?,
            syntax_tool,
            scanner_tool,
            early_fail,
            timeout: Some(DEFAULT_TOOL_TIMEOUT),
            cache: DashMap::new(),
            syntax_micros: AtomicU64::new(0),
            scan_micros: AtomicU64::new(0),
            halted: AtomicBool::new(false),
            event_sender,
        })
    }

    /// Override the bounded wait applied to each tool invocation
    ///
    /// `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the scanner supports the early-fail acceleration flag
    #[must_use]
    pub fn early_fail(&self) -> bool {
        self.early_fail
    }

    /// Run both validation stages for one file and collect its codes
    async fn validate(
        &self,
        package: &dyn Package,
        path: &str,
    ) -> Result<Vec<DiagnosticCode>, Error> {
        self.emit_debug(format!("checking {path}"));

        let disk = package.payload_path(path);
        let workdir = package.root();
        // Both stages assume UTF-8 text; not every file typed as a shell
        // script is valid text.
        let text_ok = match package.mapped(path) {
            Ok(bytes) => std::str::from_utf8(&bytes).is_ok(),
            Err(_) => false,
        };

        let mut codes = Vec::new();

        let start = Instant::now();
        let syntax = if text_ok {
            self.syntax_stage(&disk, workdir).await
        } else {
            Ok(StageOutcome::Skipped)
        };
        self.syntax_micros
            .fetch_add(elapsed_micros(start), Ordering::Relaxed);
        self.record(syntax?, path, "syntax", &mut codes);

        let start = Instant::now();
        let scan = if text_ok {
            self.scanner_stage(&disk, workdir).await
        } else {
            Ok(StageOutcome::Skipped)
        };
        self.scan_micros
            .fetch_add(elapsed_micros(start), Ordering::Relaxed);
        self.record(scan?, path, "portability", &mut codes);

        Ok(codes)
    }

    /// Stage A: POSIX syntax validation in no-execute mode
    async fn syntax_stage(&self, disk: &Path, workdir: &Path) -> Result<StageOutcome, Error> {
        let file = disk.display().to_string();
        match run_tool(&self.syntax_tool, &["-n", &file], workdir, self.timeout).await? {
            ToolExit::Code(2) => Ok(StageOutcome::Finding(DiagnosticCode::BinShSyntaxError)),
            ToolExit::Code(127) => Err(CheckError::ToolMissing {
                tool: self.syntax_tool.clone(),
            }
            .into()),
            ToolExit::TimedOut => Ok(StageOutcome::TimedOut),
            ToolExit::Code(_) => Ok(StageOutcome::Clean),
        }
    }

    /// Stage B: bashisms scan
    async fn scanner_stage(&self, disk: &Path, workdir: &Path) -> Result<StageOutcome, Error> {
        let file = disk.display().to_string();
        let mut args: Vec<&str> = Vec::with_capacity(2);
        // Early-fail can rapidly speed up the scan
        if self.early_fail {
            args.push("-e");
        }
        args.push(&file);

        match run_tool(&self.scanner_tool, &args, workdir, self.timeout).await? {
            ToolExit::Code(1) => Ok(StageOutcome::Finding(DiagnosticCode::PotentialBashisms)),
            ToolExit::Code(2) => Err(CheckError::ToolMissing {
                tool: self.scanner_tool.clone(),
            }
            .into()),
            ToolExit::TimedOut => Ok(StageOutcome::TimedOut),
            ToolExit::Code(_) => Ok(StageOutcome::Clean),
        }
    }

    fn record(
        &self,
        outcome: StageOutcome,
        path: &str,
        stage: &str,
        codes: &mut Vec<DiagnosticCode>,
    ) {
        match outcome {
            StageOutcome::Clean => {}
            StageOutcome::Finding(code) => codes.push(code),
            StageOutcome::TimedOut => {
                if !codes.contains(&DiagnosticCode::ValidatorTimedOut) {
                    codes.push(DiagnosticCode::ValidatorTimedOut);
                }
            }
            StageOutcome::Skipped => {
                self.emit_debug(format!(
                    "skipping {stage} stage for {path}: content is not valid text"
                ));
            }
        }
    }
}

#[async_trait]
impl FileCheck for ShellPortabilityCheck {
    fn name(&self) -> &'static str {
        "shell-portability"
    }

    fn path_filter(&self) -> &Regex {
        &self.filter
    }

    fn parallel(&self) -> bool {
        true
    }

    async fn check_file(&self, package: &dyn Package, path: &str) -> Result<(), Error> {
        if self.halted.load(Ordering::SeqCst) {
            return Ok(());
        }

        let Some(entry) = package.file(path) else {
            return Ok(());
        };
        // Filtering is content-based: only regular files that state they
        // are shell scripts.
        if !entry.mode.is_regular() || !entry.magic.starts_with(SHELL_MAGIC_PREFIX) {
            return Ok(());
        }

        let cell = {
            let slot = self.cache.entry(entry.digest.clone()).or_default();
            Arc::clone(slot.value())
        };

        let codes = match cell.get_or_try_init(|| self.validate(package, path)).await {
            Ok(codes) => codes,
            Err(error) => {
                self.halted.store(true, Ordering::SeqCst);
                return Err(error);
            }
        };

        for code in codes {
            let event = if *code == DiagnosticCode::ValidatorTimedOut {
                let limit = self.timeout.unwrap_or(DEFAULT_TOOL_TIMEOUT);
                CheckEvent::finding_with_detail(
                    self.name(),
                    Severity::Warning,
                    package.name(),
                    *code,
                    path,
                    format!("validation did not finish within {limit:?}"),
                )
            } else {
                CheckEvent::finding(self.name(), Severity::Warning, package.name(), *code, path)
            };
            self.emit(AppEvent::Check(event));
        }
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn finish(&self) {
        let syntax_seconds = self.syntax_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let portability_seconds = self.scan_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;

        self.emit(AppEvent::Check(CheckEvent::TimingSummary {
            check: self.name().to_string(),
            syntax_seconds,
            portability_seconds,
        }));
    }
}

impl EventEmitter for ShellPortabilityCheck {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

fn match_all_pattern() -> Result<Regex, Error> {
    Regex::new(".*").map_err(|e| {
        CheckError::PatternError {
            message: e.to_string(),
        }
        .into()
    })
}

fn supports_early_fail(help: &str) -> bool {
    help.contains("[-e]")
}

fn elapsed_micros(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_fail_detection() {
        assert!(supports_early_fail(
            "usage: checkbashisms [-e] [-f] script ..."
        ));
        assert!(!supports_early_fail("usage: checkbashisms script ..."));
    }

    #[test]
    fn shell_magic_prefix_matching() {
        assert!("POSIX shell script, ASCII text executable".starts_with(SHELL_MAGIC_PREFIX));
        assert!(!"Bourne-Again shell script".starts_with(SHELL_MAGIC_PREFIX));
        assert!(!"ELF 64-bit LSB executable".starts_with(SHELL_MAGIC_PREFIX));
    }
}
