#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core types for the pkgqa package audit library
//!
//! The data model of an audit run: diagnostic severities and codes, file
//! metadata, and the capability interface a package adapter must provide
//! to the check framework.

pub mod diagnostic;
pub mod package;

pub use diagnostic::{DiagnosticCode, Severity};
pub use package::{DirPackage, FileMode, Package, PackageFile};
