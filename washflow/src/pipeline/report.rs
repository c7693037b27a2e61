//! The result of a pipeline run.

use crate::core::{OutputFormat, StageArtifact, StageKind};
use crate::errors::StageError;
use crate::stages::StageRecord;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::PathBuf;
use uuid::Uuid;

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// All eight stages produced.
    Complete,
    /// A stage failed and no later stage was attempted.
    Aborted {
        /// The failed stage.
        at_stage: StageKind,
        /// Why it failed.
        error: StageError,
    },
}

impl RunStatus {
    /// Returns true for a complete run.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Everything a caller needs to know about a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier, also present on every log line of the run.
    pub run_id: Uuid,
    /// Directory holding the artifacts.
    pub output_root: PathBuf,
    /// Encoding of the artifacts.
    pub output_format: OutputFormat,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run ended.
    pub finished_at: Timestamp,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
    /// One entry per attempted stage, in order.
    pub entries: Vec<StageRecord>,
    /// Terminal state.
    pub status: RunStatus,
}

impl RunReport {
    /// Returns true if all eight stages produced.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    /// Returns the stage error that aborted the run.
    #[must_use]
    pub fn failure(&self) -> Option<&StageError> {
        match &self.status {
            RunStatus::Complete => None,
            RunStatus::Aborted { error, .. } => Some(error),
        }
    }

    /// Returns the stage at which the run aborted.
    #[must_use]
    pub fn aborted_at(&self) -> Option<StageKind> {
        match &self.status {
            RunStatus::Complete => None,
            RunStatus::Aborted { at_stage, .. } => Some(*at_stage),
        }
    }

    /// Returns the artifacts of every produced stage, in order.
    #[must_use]
    pub fn artifacts(&self) -> Vec<&StageArtifact> {
        self.entries.iter().filter_map(StageRecord::artifact).collect()
    }

    /// Returns the entry for a stage, if it was attempted.
    #[must_use]
    pub fn entry(&self, stage: StageKind) -> Option<&StageRecord> {
        self.entries.iter().find(|entry| entry.stage == stage)
    }

    /// Returns the final painting, present only for a complete run.
    #[must_use]
    pub fn final_artifact(&self) -> Option<&StageArtifact> {
        self.entry(StageKind::Finish).and_then(StageRecord::artifact)
    }

    /// Turns an aborted run into its stage error.
    pub fn into_result(self) -> Result<Self, StageError> {
        match self.status {
            RunStatus::Complete => Ok(self),
            RunStatus::Aborted { error, .. } => Err(error),
        }
    }

    /// Renders a short human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {} ({} ms)", self.run_id, self.duration_ms);
        for entry in &self.entries {
            match (entry.artifact(), entry.error()) {
                (Some(artifact), _) => {
                    let _ = writeln!(out, "  [ok]   {}: {}", entry.name, artifact.path.display());
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "  [fail] {}: {}", entry.name, error.reason());
                }
                (None, None) => {}
            }
        }
        match &self.status {
            RunStatus::Complete => {
                let _ = write!(out, "complete: {} artifacts", self.entries.len());
            }
            RunStatus::Aborted { at_stage, .. } => {
                let _ = write!(
                    out,
                    "aborted at stage {} ({at_stage}): {} artifacts",
                    at_stage.position(),
                    self.artifacts().len()
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageOutcome;

    fn produced(stage: StageKind) -> StageRecord {
        StageRecord {
            stage,
            position: stage.position(),
            name: stage.display_name().to_string(),
            started_at: chrono::Utc::now(),
            duration_ms: 1,
            outcome: StageOutcome::Produced {
                artifact: StageArtifact::new(
                    stage,
                    PathBuf::from(format!("out/{}.jpg", stage.canonical_stem())),
                    OutputFormat::Jpeg,
                    b"jpg",
                    (1, 1),
                ),
            },
        }
    }

    fn report(entries: Vec<StageRecord>, status: RunStatus) -> RunReport {
        let now = chrono::Utc::now();
        RunReport {
            run_id: Uuid::new_v4(),
            output_root: PathBuf::from("out"),
            output_format: OutputFormat::Jpeg,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            entries,
            status,
        }
    }

    #[test]
    fn test_aborted_report_accessors() {
        let error = StageError::generation(StageKind::Wash2, StageError::NO_IMAGE);
        let mut entries = vec![produced(StageKind::Sketch), produced(StageKind::Wash1)];
        entries.push(StageRecord {
            outcome: StageOutcome::Failed {
                error: error.clone(),
            },
            ..produced(StageKind::Wash2)
        });
        let report = report(
            entries,
            RunStatus::Aborted {
                at_stage: StageKind::Wash2,
                error: error.clone(),
            },
        );

        assert!(!report.is_complete());
        assert_eq!(report.aborted_at(), Some(StageKind::Wash2));
        assert_eq!(report.failure(), Some(&error));
        assert_eq!(report.artifacts().len(), 2);
        assert!(report.final_artifact().is_none());
        assert!(report.summary().contains("aborted at stage 3 (wash-2): 2 artifacts"));
        assert_eq!(report.into_result().unwrap_err(), error);
    }

    #[test]
    fn test_complete_report() {
        let entries = StageKind::ALL.into_iter().map(produced).collect();
        let report = report(entries, RunStatus::Complete);

        assert!(report.is_complete());
        assert!(report.failure().is_none());
        assert_eq!(
            report.final_artifact().map(|a| a.filename.as_str()),
            Some("step8_finished_watercolor.jpg")
        );
        assert!(report.summary().ends_with("complete: 8 artifacts"));
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_status_serialization() {
        let status = RunStatus::Aborted {
            at_stage: StageKind::Shadow,
            error: StageError::generation(StageKind::Shadow, "timeout"),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "aborted");
        assert_eq!(json["at_stage"], "shadow");
        assert_eq!(json["error"]["kind"], "generation_failed");

        let complete = serde_json::to_value(RunStatus::Complete).unwrap();
        assert_eq!(complete["state"], "complete");
    }
}
