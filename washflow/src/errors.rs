//! Error types for the washflow pipeline.
//!
//! Only [`PipelineError`] ever escapes a run. Everything that goes wrong while a
//! stage is executing is captured as a [`StageError`] inside the run report.

use crate::core::StageKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The error returned by a run before any stage executes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The run request violated a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
}

impl PipelineError {
    /// Returns the underlying input error.
    #[must_use]
    pub fn input_error(&self) -> &InputError {
        match self {
            Self::InvalidInput(err) => err,
        }
    }
}

/// Precondition violations detected before stage 1 begins.
#[derive(Debug, Error)]
pub enum InputError {
    /// The stage list does not have exactly eight entries.
    #[error("expected {expected} stage definitions, got {actual}")]
    StageCount {
        /// Required number of stages.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },

    /// A stage definition is out of its fixed position.
    #[error("stage at position {position} must be '{expected}', got '{actual}'")]
    StageOrder {
        /// One-based position in the supplied list.
        position: usize,
        /// The stage required at that position.
        expected: StageKind,
        /// The stage found there.
        actual: StageKind,
    },

    /// An output filename template is empty or would escape the output root.
    #[error("stage '{stage}' has an invalid output filename '{filename}'")]
    InvalidFilename {
        /// The offending stage.
        stage: StageKind,
        /// The rejected filename template.
        filename: String,
    },

    /// Two stages would write to the same artifact.
    #[error("stages '{first}' and '{second}' share the output filename '{filename}'")]
    DuplicateFilename {
        /// The earlier stage.
        first: StageKind,
        /// The later stage.
        second: StageKind,
        /// The shared filename template.
        filename: String,
    },

    /// The original image could not be read.
    #[error("original image {source_name} could not be read: {reason}")]
    UnreadableImage {
        /// Where the image was supposed to come from.
        source_name: String,
        /// Why reading failed.
        reason: String,
    },

    /// The original image bytes are not a decodable image.
    #[error("original image {source_name} could not be decoded: {reason}")]
    UndecodableImage {
        /// Where the image came from.
        source_name: String,
        /// Decoder message.
        reason: String,
    },

    /// The output root cannot be created or written.
    #[error("output root {} is not writable: {reason}", path.display())]
    OutputRoot {
        /// The configured output root.
        path: PathBuf,
        /// Why it is unusable.
        reason: String,
    },
}

/// A failure recorded against a single stage.
///
/// Stage errors never propagate out of the runner loop. They become the
/// final `Failed` entry of the run log and the run's terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    /// The generator returned no image or the call itself failed.
    #[error("stage '{stage}' generation failed: {reason}")]
    GenerationFailed {
        /// The failing stage.
        stage: StageKind,
        /// Human-readable reason.
        reason: String,
    },

    /// The generated image could not be encoded or written.
    #[error("stage '{stage}' persistence failed: {reason}")]
    PersistenceFailed {
        /// The failing stage.
        stage: StageKind,
        /// Human-readable reason.
        reason: String,
    },

    /// The caller cancelled the run while this stage was next or in flight.
    #[error("stage '{stage}' cancelled: {reason}")]
    Cancelled {
        /// The stage that did not complete.
        stage: StageKind,
        /// The cancellation reason supplied by the caller.
        reason: String,
    },
}

impl StageError {
    /// Reason used when the generator answers without image data.
    pub const NO_IMAGE: &'static str = "no image returned";

    /// Reason used when a timeout elapses.
    pub const TIMEOUT: &'static str = "timeout";

    /// Creates a generation failure.
    #[must_use]
    pub fn generation(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::GenerationFailed {
            stage,
            reason: reason.into(),
        }
    }

    /// Creates a persistence failure.
    #[must_use]
    pub fn persistence(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            stage,
            reason: reason.into(),
        }
    }

    /// Creates a cancellation failure.
    #[must_use]
    pub fn cancelled(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            stage,
            reason: reason.into(),
        }
    }

    /// Returns the stage this error belongs to.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        match self {
            Self::GenerationFailed { stage, .. }
            | Self::PersistenceFailed { stage, .. }
            | Self::Cancelled { stage, .. } => *stage,
        }
    }

    /// Returns the failure reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::GenerationFailed { reason, .. }
            | Self::PersistenceFailed { reason, .. }
            | Self::Cancelled { reason, .. } => reason,
        }
    }

    /// Returns true if this failure came from the generator.
    #[must_use]
    pub fn is_generation(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }

    /// Returns true if this failure came from persisting the artifact.
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::PersistenceFailed { .. })
    }

    /// Returns true if the run was cancelled at this stage.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors raised by an image generation backend.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The backend is misconfigured (missing key, bad URL).
    #[error("generator configuration error: {0}")]
    Config(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors raised by an artifact store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The output root could not be created or probed.
    #[error("cannot prepare {}: {source}", path.display())]
    Prepare {
        /// The output root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing an artifact failed.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing a stale artifact failed.
    #[error("cannot remove {}: {source}", path.display())]
    Remove {
        /// Path being removed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected schema.
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A required environment variable is missing or empty.
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// The configuration produced an invalid stage set.
    #[error(transparent)]
    Invalid(#[from] PipelineError),
}
