//! The per-file check trait

use async_trait::async_trait;
use regex::Regex;

use pkgqa_errors::Error;
use pkgqa_types::Package;

/// A check that inspects package files one at a time
///
/// Implementations own whatever state they accumulate across files (result
/// caches, timing totals). Hooks take `&self`: when [`parallel`] is true
/// the dispatcher may invoke [`check_file`] for distinct files
/// concurrently, so shared state must be interior-mutable and thread-safe.
///
/// [`parallel`]: FileCheck::parallel
/// [`check_file`]: FileCheck::check_file
#[async_trait]
pub trait FileCheck: Send + Sync {
    /// Check name, used in events
    fn name(&self) -> &'static str;

    /// Selection pattern applied to package-relative paths
    fn path_filter(&self) -> &Regex;

    /// Whether per-file hooks for distinct files may run in parallel
    fn parallel(&self) -> bool {
        false
    }

    /// Inspect one file of the package
    ///
    /// Diagnostics are emitted to the event channel, never returned.
    /// An `Err` is a fatal, check-level failure (e.g. a required external
    /// tool is absent) and stops further dispatch for this check.
    ///
    /// # Errors
    /// Returns an error only for check-level failures, not per-file
    /// findings.
    async fn check_file(&self, package: &dyn Package, path: &str) -> Result<(), Error>;

    /// Flush accumulated state after all files of a scan were dispatched
    ///
    /// Invoked exactly once per scan by the dispatcher, on both the
    /// success and the fatal path.
    async fn finish(&self) {}
}
