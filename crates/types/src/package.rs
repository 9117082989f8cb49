//! The package capability interface and its directory-backed adapter
//!
//! Checks never parse archive formats themselves; they see a package as an
//! ordered file listing with metadata plus byte-level content access. Any
//! archive or package-format frontend can implement [`Package`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pkgqa_errors::{Error, PackageError};
use pkgqa_hash::Digest;

const S_IFMT: u32 = 0o170_000;
const S_IFREG: u32 = 0o100_000;

/// Raw file-mode bits as recorded in the package metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMode(pub u32);

impl FileMode {
    /// True when the mode bits describe a regular file
    #[must_use]
    pub fn is_regular(self) -> bool {
        self.0 & S_IFMT == S_IFREG
    }
}

/// Metadata for a single file inside a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageFile {
    /// Package-relative path with a leading `/` (e.g. `/usr/bin/foo`)
    pub path: String,
    /// File-mode bits
    pub mode: FileMode,
    /// Type/magic descriptor string (e.g. `POSIX shell script, ASCII text`)
    pub magic: String,
    /// Content digest of the raw bytes
    pub digest: Digest,
}

impl PackageFile {
    /// Create a new package file entry
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        mode: FileMode,
        magic: impl Into<String>,
        digest: Digest,
    ) -> Self {
        Self {
            path: path.into(),
            mode,
            magic: magic.into(),
            digest,
        }
    }
}

/// Capability interface a package adapter provides to the check framework
pub trait Package: Send + Sync {
    /// Package name, used in diagnostics
    fn name(&self) -> &str;

    /// Ordered listing of all files in the package
    fn files(&self) -> &[PackageFile];

    /// Metadata lookup by package-relative path
    fn file(&self, path: &str) -> Option<&PackageFile>;

    /// True for source packages
    fn is_source(&self) -> bool;

    /// Directory the package payload is unpacked under
    fn root(&self) -> &Path;

    /// On-disk location of a package-relative path, handed to external tools
    fn payload_path(&self, path: &str) -> PathBuf {
        self.root().join(path.trim_start_matches('/'))
    }

    /// Byte-level view of a file's content, with no text decoding
    ///
    /// # Errors
    /// Returns [`PackageError::FileNotFound`] when the payload file does
    /// not exist, [`PackageError::ReadFailed`] for any other read failure.
    fn mapped(&self, path: &str) -> Result<Vec<u8>, Error> {
        std::fs::read(self.payload_path(path)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PackageError::FileNotFound {
                    path: path.to_string(),
                }
                .into()
            } else {
                PackageError::ReadFailed {
                    path: path.to_string(),
                    message: e.to_string(),
                }
                .into()
            }
        })
    }
}

/// Package adapter over an unpacked directory tree
///
/// The file listing is built by the caller; content and tool invocations
/// resolve against `root`. Integration tests use this adapter directly.
#[derive(Debug, Clone)]
pub struct DirPackage {
    name: String,
    root: PathBuf,
    files: Vec<PackageFile>,
    source: bool,
}

impl DirPackage {
    /// Create an empty package rooted at `root`
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            files: Vec::new(),
            source: false,
        }
    }

    /// Mark this package as a source package
    pub fn set_source(&mut self, source: bool) {
        self.source = source;
    }

    /// Append a file entry to the listing
    pub fn push(&mut self, file: PackageFile) {
        self.files.push(file);
    }

    /// Register a file already present under the payload root
    ///
    /// Reads the on-disk content to compute the digest and takes the mode
    /// bits from the filesystem.
    ///
    /// # Errors
    /// Returns an error if the payload file cannot be read.
    pub fn push_from_disk(&mut self, path: &str, magic: impl Into<String>) -> Result<(), Error> {
        let disk = self.root.join(path.trim_start_matches('/'));
        let data = std::fs::read(&disk).map_err(|e| PackageError::ReadFailed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let mode = file_mode_bits(&disk)?;

        self.files.push(PackageFile::new(
            path,
            FileMode(mode),
            magic,
            Digest::from_data(&data),
        ));
        Ok(())
    }
}

impl Package for DirPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn files(&self) -> &[PackageFile] {
        &self.files
    }

    fn file(&self, path: &str) -> Option<&PackageFile> {
        self.files.iter().find(|f| f.path == path)
    }

    fn is_source(&self) -> bool {
        self.source
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(unix)]
fn file_mode_bits(path: &Path) -> Result<u32, Error> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata(path).map_err(|e| Error::io_with_path(&e, path))?;
    Ok(meta.mode())
}

#[cfg(not(unix))]
fn file_mode_bits(path: &Path) -> Result<u32, Error> {
    let meta = std::fs::metadata(path).map_err(|e| Error::io_with_path(&e, path))?;
    Ok(if meta.is_file() { S_IFREG } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_regular_file() {
        assert!(FileMode(0o100_644).is_regular());
        assert!(FileMode(0o100_755).is_regular());
        assert!(!FileMode(0o040_755).is_regular()); // directory
        assert!(!FileMode(0o120_777).is_regular()); // symlink
    }

    #[test]
    fn payload_path_strips_leading_slash() {
        let pkg = DirPackage::new("demo", "/tmp/pkgroot");
        assert_eq!(
            pkg.payload_path("/usr/bin/tool"),
            PathBuf::from("/tmp/pkgroot/usr/bin/tool")
        );
    }

    #[test]
    fn push_from_disk_computes_digest_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("usr/bin")).unwrap();
        std::fs::write(dir.path().join("usr/bin/hello"), b"#!/bin/sh\n").unwrap();

        let mut pkg = DirPackage::new("demo", dir.path());
        pkg.push_from_disk("/usr/bin/hello", "POSIX shell script, ASCII text")
            .unwrap();

        let entry = pkg.file("/usr/bin/hello").unwrap();
        assert!(entry.mode.is_regular());
        assert_eq!(entry.digest, Digest::from_data(b"#!/bin/sh\n"));
        assert_eq!(pkg.mapped("/usr/bin/hello").unwrap(), b"#!/bin/sh\n");
    }

    #[test]
    fn file_lookup_misses() {
        let pkg = DirPackage::new("demo", "/tmp/none");
        assert!(pkg.file("/usr/bin/absent").is_none());
        assert!(matches!(
            pkg.mapped("/usr/bin/absent"),
            Err(Error::Package(PackageError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn unreadable_content_is_read_failed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("usr/share/doc")).unwrap();

        let pkg = DirPackage::new("demo", dir.path());
        // The path resolves to a directory, so the read fails without ENOENT
        assert!(matches!(
            pkg.mapped("/usr/share/doc"),
            Err(Error::Package(PackageError::ReadFailed { .. }))
        ));
    }
}
