#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Per-file package checks for pkgqa
//!
//! This crate holds the check dispatch framework and its two concrete
//! checks:
//!
//! - [`ShellPortabilityCheck`] validates POSIX shell scripts through two
//!   external tools, caching results by content digest so duplicated
//!   content across packages is validated once.
//! - [`BuildContaminationCheck`] scans raw file bytes for embedded build
//!   dates and leaked build-staging paths.
//!
//! [`CheckRunner`] drives a check over one package at a time: it selects
//! candidate paths, invokes the per-file hook (optionally across a worker
//! pool), and guarantees the check's `finish` hook runs exactly once.
//! All diagnostics leave the crate as `pkgqa-events` events.

mod contamination;
mod dispatch;
mod shell;
mod tool;
mod traits;

pub use contamination::BuildContaminationCheck;
pub use dispatch::CheckRunner;
pub use shell::ShellPortabilityCheck;
pub use traits::FileCheck;
