//! Artifact persistence.

mod fs;

use crate::errors::StorageError;
use std::path::PathBuf;

pub use fs::FsArtifactStore;

/// Destination for stage artifacts.
///
/// Filenames are plain names (no separators) resolved against the store's
/// location. Writing the same filename twice replaces the earlier file.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactStore: Send + Sync {
    /// Returns the directory artifacts are written to.
    fn location(&self) -> PathBuf;

    /// Makes sure the location exists and accepts writes.
    fn prepare(&self) -> Result<(), StorageError>;

    /// Writes `bytes` under `filename` and returns the final path.
    ///
    /// Either the complete file appears at its final path or nothing does.
    fn persist(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError>;

    /// Removes `filename` if present. Returns whether a file was removed.
    fn discard(&self, filename: &str) -> Result<bool, StorageError>;
}
