//! Filesystem artifact store with atomic writes.

use crate::errors::StorageError;
use crate::storage::ArtifactStore;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes artifacts into a single directory.
///
/// Each file is written to a temporary file in the same directory, synced,
/// and renamed into place.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`. Nothing is touched until [`prepare`].
    ///
    /// [`prepare`]: ArtifactStore::prepare
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, filename: &str) -> io::Result<PathBuf> {
        let plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);
        if plain {
            Ok(self.root.join(filename))
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{filename}' is not a plain file name"),
            ))
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn location(&self) -> PathBuf {
        self.root.clone()
    }

    fn prepare(&self) -> Result<(), StorageError> {
        let prepare_err = |source| StorageError::Prepare {
            path: self.root.clone(),
            source,
        };

        std::fs::create_dir_all(&self.root).map_err(prepare_err)?;
        // Probe writability; the file is removed when dropped.
        NamedTempFile::new_in(&self.root).map_err(prepare_err)?;
        Ok(())
    }

    fn persist(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let dest = self
            .resolve(filename)
            .map_err(write_error(&self.root.join(filename)))?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(write_error(&dest))?;
        tmp.write_all(bytes).map_err(write_error(&dest))?;
        tmp.as_file().sync_all().map_err(write_error(&dest))?;
        tmp.persist(&dest).map_err(|e| StorageError::Write {
            path: dest.clone(),
            source: e.error,
        })?;

        debug!(path = %dest.display(), bytes = bytes.len(), "Artifact written");
        Ok(dest)
    }

    fn discard(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.resolve(filename).map_err(|source| StorageError::Remove {
            path: self.root.join(filename),
            source,
        })?;

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Stale artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Remove { path, source }),
        }
    }
}

fn write_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Write { path, source }
}
