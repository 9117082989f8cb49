//! File selection and check dispatch

use futures::stream::{self, StreamExt};

use pkgqa_errors::Error;
use pkgqa_events::{AppEvent, CheckEvent, EventEmitter, EventSender};
use pkgqa_types::Package;

use crate::traits::FileCheck;

/// Drives a [`FileCheck`] over the files of a package
///
/// Every path matching the check's selection pattern is dispatched exactly
/// once. Checks that declare a concurrency preference run across a worker
/// pool sized by the host; everything else runs sequentially. The check's
/// `finish` hook runs exactly once per scan regardless of outcome.
pub struct CheckRunner {
    workers: usize,
    event_sender: Option<EventSender>,
}

impl CheckRunner {
    /// Create a runner with a worker pool sized by the host environment
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            event_sender: None,
        }
    }

    /// Create a runner with an explicit worker count
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            event_sender: None,
        }
    }

    /// Attach an event sender for scan lifecycle events
    #[must_use]
    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Scan one package with one check
    ///
    /// # Errors
    /// Propagates the first fatal, check-level failure reported by a
    /// per-file hook. Per-file diagnostics never surface here; they go to
    /// the event channel.
    pub async fn scan(&self, check: &dyn FileCheck, package: &dyn Package) -> Result<(), Error> {
        let filter = check.path_filter();
        let matched: Vec<&str> = package
            .files()
            .iter()
            .map(|f| f.path.as_str())
            .filter(|path| filter.is_match(path))
            .collect();

        self.emit(AppEvent::Check(CheckEvent::ScanStarted {
            check: check.name().to_string(),
            package: package.name().to_string(),
            files: matched.len(),
        }));

        let result = if check.parallel() && self.workers > 1 {
            self.scan_parallel(check, package, &matched).await
        } else {
            Self::scan_sequential(check, package, &matched).await
        };

        // Exactly once, on both the success and the fatal path, so
        // accumulated metrics are never lost to an aborted scan.
        check.finish().await;

        match result {
            Ok(()) => {
                self.emit(AppEvent::Check(CheckEvent::ScanCompleted {
                    check: check.name().to_string(),
                    package: package.name().to_string(),
                    files_matched: matched.len(),
                }));
                Ok(())
            }
            Err(error) => {
                self.emit(AppEvent::Check(CheckEvent::CheckFailed {
                    check: check.name().to_string(),
                    error: error.to_string(),
                }));
                Err(error)
            }
        }
    }

    async fn scan_sequential(
        check: &dyn FileCheck,
        package: &dyn Package,
        matched: &[&str],
    ) -> Result<(), Error> {
        for path in matched {
            check.check_file(package, path).await?;
        }
        Ok(())
    }

    async fn scan_parallel(
        &self,
        check: &dyn FileCheck,
        package: &dyn Package,
        matched: &[&str],
    ) -> Result<(), Error> {
        let mut hooks = stream::iter(
            matched
                .iter()
                .map(|path| check.check_file(package, path)),
        )
        .buffer_unordered(self.workers);

        while let Some(result) = hooks.next().await {
            // Returning drops the stream, which stops scheduling the
            // remaining files and cancels in-flight hooks.
            result?;
        }
        Ok(())
    }
}

impl Default for CheckRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter for CheckRunner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use regex::Regex;

    use pkgqa_errors::CheckError;
    use pkgqa_hash::Digest;
    use pkgqa_types::{DirPackage, FileMode, PackageFile};

    struct RecordingCheck {
        filter: Regex,
        parallel: bool,
        fail_on: Option<String>,
        dispatched: Mutex<Vec<String>>,
        finished: AtomicUsize,
    }

    impl RecordingCheck {
        fn new(pattern: &str, parallel: bool) -> Self {
            Self {
                filter: Regex::new(pattern).unwrap(),
                parallel,
                fail_on: None,
                dispatched: Mutex::new(Vec::new()),
                finished: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileCheck for RecordingCheck {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn path_filter(&self) -> &Regex {
            &self.filter
        }

        fn parallel(&self) -> bool {
            self.parallel
        }

        async fn check_file(&self, _package: &dyn Package, path: &str) -> Result<(), Error> {
            self.dispatched.lock().unwrap().push(path.to_string());
            if self.fail_on.as_deref() == Some(path) {
                return Err(CheckError::ToolMissing {
                    tool: "stub".to_string(),
                }
                .into());
            }
            Ok(())
        }

        async fn finish(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn package_with(paths: &[&str]) -> DirPackage {
        let mut pkg = DirPackage::new("demo", "/tmp/none");
        for path in paths {
            pkg.push(PackageFile::new(
                *path,
                FileMode(0o100_644),
                "ASCII text",
                Digest::from_data(path.as_bytes()),
            ));
        }
        pkg
    }

    #[tokio::test]
    async fn selection_pattern_filters_paths() {
        let pkg = package_with(&["/usr/bin/a", "/etc/b", "/usr/bin/c"]);
        let check = RecordingCheck::new("^/usr/bin/", false);

        CheckRunner::with_workers(1).scan(&check, &pkg).await.unwrap();

        let dispatched = check.dispatched.lock().unwrap().clone();
        assert_eq!(dispatched, vec!["/usr/bin/a", "/usr/bin/c"]);
        assert_eq!(check.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn parallel_dispatch_is_exactly_once() {
        let paths: Vec<String> = (0..32).map(|i| format!("/usr/share/f{i}")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let pkg = package_with(&refs);
        let check = RecordingCheck::new(".*", true);

        CheckRunner::with_workers(8).scan(&check, &pkg).await.unwrap();

        let mut dispatched = check.dispatched.lock().unwrap().clone();
        dispatched.sort();
        let mut expected = paths.clone();
        expected.sort();
        assert_eq!(dispatched, expected);
        assert_eq!(check.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_hook_stops_scheduling_and_still_finishes() {
        let pkg = package_with(&["/a", "/b", "/c"]);
        let mut check = RecordingCheck::new(".*", false);
        check.fail_on = Some("/a".to_string());

        let (tx, mut rx) = pkgqa_events::channel();
        let result = CheckRunner::with_workers(1)
            .with_events(tx)
            .scan(&check, &pkg)
            .await;

        assert!(result.unwrap_err().is_tool_missing());
        assert_eq!(*check.dispatched.lock().unwrap(), vec!["/a"]);
        assert_eq!(check.finished.load(Ordering::SeqCst), 1);

        let mut saw_failed = false;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Check(CheckEvent::CheckFailed { check, .. }) = event {
                assert_eq!(check, "recording");
                saw_failed = true;
            }
        }
        assert!(saw_failed);
    }

    #[tokio::test]
    async fn scan_lifecycle_events() {
        let pkg = package_with(&["/usr/bin/a", "/usr/bin/b"]);
        let check = RecordingCheck::new(".*", false);

        let (tx, mut rx) = pkgqa_events::channel();
        CheckRunner::with_workers(1)
            .with_events(tx)
            .scan(&check, &pkg)
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            AppEvent::Check(CheckEvent::ScanStarted { files, .. }) => assert_eq!(files, 2),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            AppEvent::Check(CheckEvent::ScanCompleted { files_matched, .. }) => {
                assert_eq!(files_matched, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
