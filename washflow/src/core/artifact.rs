//! Persisted stage artifact.

use crate::core::{OutputFormat, StageKind};
use crate::utils::{sha256_hex, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An image file written by a produced stage.
///
/// The filename is derived from the stage definition alone, so a re-run
/// against the same output root lands on the same path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageArtifact {
    /// The stage that produced the artifact.
    pub stage: StageKind,

    /// Final location of the file.
    pub path: PathBuf,

    /// File name inside the output root.
    pub filename: String,

    /// Encoding of the file.
    pub format: OutputFormat,

    /// Hex SHA-256 of the written bytes.
    pub sha256: String,

    /// Size of the written file in bytes.
    pub byte_len: u64,

    /// Pixel width.
    pub width: u32,

    /// Pixel height.
    pub height: u32,

    /// When the file was written.
    pub created_at: Timestamp,
}

impl StageArtifact {
    /// Describes bytes that were just written to `path`.
    #[must_use]
    pub fn new(
        stage: StageKind,
        path: PathBuf,
        format: OutputFormat,
        bytes: &[u8],
        dimensions: (u32, u32),
    ) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            stage,
            filename,
            format,
            sha256: sha256_hex(bytes),
            byte_len: bytes.len() as u64,
            width: dimensions.0,
            height: dimensions.1,
            created_at: chrono::Utc::now(),
            path,
        }
    }

    /// Returns the path of the artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the file is still present on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}
