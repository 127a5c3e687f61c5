//! Content-addressed blob storage for SMD.
//!
//! Blobs live directly under one root directory:
//! ```text
//! {root}/
//! ├── 916f0027a575...35f9          (no destination hint)
//! └── taco_916f0027a575...35f9     (hint "taco")
//! ```
//! Identical bytes with an identical hint always land on the same path, so
//! a second write of the same content is skipped.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::hash::ByteSource;
use crate::{Result, SmdError};

/// Result of a blob write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The blob was newly created.
    Written,
    /// A blob already existed at the location; nothing was written.
    Deduplicated,
}

/// Blob store capability.
///
/// Implementations are synchronous; async callers run them on the blocking
/// pool.
pub trait BlobStore: Send + Sync {
    /// Derive the storage path for a digest and optional destination hint.
    fn location(&self, hint: Option<&str>, digest: &str) -> Result<PathBuf>;

    /// Write the remaining bytes of `source` to `location` unless a blob
    /// already exists there.
    fn put(&self, location: &Path, source: &mut dyn ByteSource) -> Result<PutOutcome>;

    /// Read a whole blob.
    fn get(&self, location: &Path) -> Result<Vec<u8>>;

    fn exists(&self, location: &Path) -> bool;

    /// Delete a blob. Returns false if it did not exist.
    fn delete(&self, location: &Path) -> Result<bool>;
}

/// Normalize a destination hint. Empty hints mean no hint; hints that could
/// escape the store root are rejected.
pub fn validate_hint(hint: Option<&str>) -> Result<Option<&str>> {
    let Some(hint) = hint.filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    if hint.contains(['/', '\\', '\0']) || hint.contains("..") {
        return Err(SmdError::Validation(format!(
            "invalid destination hint: {hint:?}"
        )));
    }
    Ok(Some(hint))
}

/// Disk-backed blob store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Directory holding every blob.
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `root`.
    ///
    /// The root directory will be created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(SmdError::Storage)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Blob file name for a digest and hint.
    pub fn blob_name(hint: Option<&str>, digest: &str) -> String {
        match hint {
            Some(hint) if !hint.is_empty() => format!("{hint}_{digest}"),
            _ => digest.to_string(),
        }
    }

    fn check_within_root(&self, location: &Path) -> Result<()> {
        if location.parent() == Some(self.root.as_path()) {
            Ok(())
        } else {
            Err(SmdError::Validation(format!(
                "location {} is outside the store root",
                location.display()
            )))
        }
    }
}

impl BlobStore for FileStorage {
    fn location(&self, hint: Option<&str>, digest: &str) -> Result<PathBuf> {
        let hint = validate_hint(hint)?;
        if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SmdError::Validation(format!("invalid digest: {digest:?}")));
        }
        Ok(self.root.join(Self::blob_name(hint, digest)))
    }

    fn put(&self, location: &Path, source: &mut dyn ByteSource) -> Result<PutOutcome> {
        self.check_within_root(location)?;

        if location.exists() {
            debug!(location = %location.display(), "Blob already stored");
            return Ok(PutOutcome::Deduplicated);
        }

        // Stage in the root so the final rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(&self.root).map_err(SmdError::Storage)?;
        io::copy(source, staged.as_file_mut()).map_err(SmdError::Storage)?;
        staged.as_file_mut().flush().map_err(SmdError::Storage)?;
        staged.as_file().sync_all().map_err(SmdError::Storage)?;

        match staged.persist_noclobber(location) {
            Ok(_) => {
                debug!(location = %location.display(), "Blob written");
                Ok(PutOutcome::Written)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(location = %location.display(), "Lost create race, blob already stored");
                Ok(PutOutcome::Deduplicated)
            }
            Err(e) => Err(SmdError::Storage(e.error)),
        }
    }

    fn get(&self, location: &Path) -> Result<Vec<u8>> {
        self.check_within_root(location)?;
        match fs::read(location) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SmdError::NotFound(format!("blob {}", location.display())))
            }
            Err(e) => Err(SmdError::Storage(e)),
        }
    }

    fn exists(&self, location: &Path) -> bool {
        self.check_within_root(location).is_ok() && location.is_file()
    }

    fn delete(&self, location: &Path) -> Result<bool> {
        self.check_within_root(location)?;
        match fs::remove_file(location) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SmdError::Storage(e)),
        }
    }
}
