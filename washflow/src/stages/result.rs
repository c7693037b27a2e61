//! Stage result and run log entry types.

use crate::core::{ReferenceImage, StageArtifact, StageKind, StageStatus};
use crate::errors::StageError;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The outcome of exactly one stage attempt.
///
/// Created once per stage and never modified.
#[derive(Debug, Clone)]
pub enum StageResult {
    /// The stage generated an image and persisted it.
    Produced {
        /// The persisted image, used as the next stage's reference.
        image: ReferenceImage,
        /// Where and what was written.
        artifact: StageArtifact,
    },
    /// The stage did not produce an image.
    Failed(StageError),
}

impl StageResult {
    /// Returns the status discriminant.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Produced { .. } => StageStatus::Produced,
            Self::Failed(_) => StageStatus::Failed,
        }
    }

    /// Returns true if the stage produced an image.
    #[must_use]
    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Produced { .. })
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&StageError> {
        match self {
            Self::Produced { .. } => None,
            Self::Failed(err) => Some(err),
        }
    }
}

impl From<StageError> for StageResult {
    fn from(err: StageError) -> Self {
        Self::Failed(err)
    }
}

/// Serializable outcome stored in the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage produced an artifact.
    Produced {
        /// The persisted artifact.
        artifact: StageArtifact,
    },
    /// The stage failed and the run stopped.
    Failed {
        /// Why the stage failed.
        error: StageError,
    },
}

/// One entry of the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The stage attempted.
    pub stage: StageKind,
    /// One-based position of the stage.
    pub position: u8,
    /// Display name from the stage definition.
    pub name: String,
    /// When the attempt started.
    pub started_at: Timestamp,
    /// Wall-clock duration of the attempt.
    pub duration_ms: u64,
    /// What happened.
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

impl StageRecord {
    /// Returns the status discriminant.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self.outcome {
            StageOutcome::Produced { .. } => StageStatus::Produced,
            StageOutcome::Failed { .. } => StageStatus::Failed,
        }
    }

    /// Returns true if the stage produced an artifact.
    #[must_use]
    pub fn is_produced(&self) -> bool {
        self.status().is_success()
    }

    /// Returns the artifact of a produced stage.
    #[must_use]
    pub fn artifact(&self) -> Option<&StageArtifact> {
        match &self.outcome {
            StageOutcome::Produced { artifact } => Some(artifact),
            StageOutcome::Failed { .. } => None,
        }
    }

    /// Returns the error of a failed stage.
    #[must_use]
    pub fn error(&self) -> Option<&StageError> {
        match &self.outcome {
            StageOutcome::Produced { .. } => None,
            StageOutcome::Failed { error } => Some(error),
        }
    }

    /// Returns the artifact path, absent for a failed stage.
    #[must_use]
    pub fn output_path(&self) -> Option<&Path> {
        self.artifact().map(StageArtifact::path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputFormat;
    use std::path::PathBuf;

    fn record(outcome: StageOutcome) -> StageRecord {
        StageRecord {
            stage: StageKind::Shadow,
            position: 5,
            name: StageKind::Shadow.display_name().to_string(),
            started_at: chrono::Utc::now(),
            duration_ms: 12,
            outcome,
        }
    }

    #[test]
    fn test_failed_record_has_no_path() {
        let entry = record(StageOutcome::Failed {
            error: StageError::generation(StageKind::Shadow, StageError::NO_IMAGE),
        });
        assert_eq!(entry.status(), StageStatus::Failed);
        assert!(entry.output_path().is_none());
        assert_eq!(entry.error().map(StageError::reason), Some("no image returned"));
    }

    #[test]
    fn test_produced_record_serializes_flat() {
        let artifact = StageArtifact::new(
            StageKind::Shadow,
            PathBuf::from("out/step5_shadows.jpg"),
            OutputFormat::Jpeg,
            b"x",
            (1, 1),
        );
        let entry = record(StageOutcome::Produced { artifact });
        assert!(entry.is_produced());

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "produced");
        assert_eq!(json["stage"], "shadow");
        assert_eq!(json["artifact"]["filename"], "step5_shadows.jpg");

        let back: StageRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_stage_result_from_error() {
        let result = StageResult::from(StageError::persistence(StageKind::Finish, "disk full"));
        assert!(!result.is_produced());
        assert_eq!(result.status(), StageStatus::Failed);
        assert!(result.error().is_some_and(StageError::is_persistence));
    }
}
