//! The value threaded through the eight stages of a run.

use crate::context::RunIdentity;
use crate::core::{ReferenceImage, StageKind};
use crate::stages::{StageDefinition, StageOutcome, StageRecord, StageResult};
use crate::utils::Timestamp;

/// Ordered conditioning images for one generation call.
///
/// Stage 1 sees only the original. Every later stage sees the original
/// followed by the output of the stage immediately before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    images: Vec<ReferenceImage>,
}

impl ReferenceSet {
    fn original_only(original: ReferenceImage) -> Self {
        Self {
            images: vec![original],
        }
    }

    fn with_previous(original: ReferenceImage, previous: ReferenceImage) -> Self {
        Self {
            images: vec![original, previous],
        }
    }

    /// Returns the images in the order they are sent.
    #[must_use]
    pub fn as_slice(&self) -> &[ReferenceImage] {
        &self.images
    }

    /// Returns the original photograph.
    #[must_use]
    pub fn original(&self) -> &ReferenceImage {
        &self.images[0]
    }

    /// Returns the previous stage output, absent for stage 1.
    #[must_use]
    pub fn previous(&self) -> Option<&ReferenceImage> {
        self.images.get(1)
    }

    /// Returns the number of images (one or two).
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Always false.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Immutable per-run state.
///
/// Each stage step consumes the context and returns a new one with the
/// stage's record appended. The original image is fixed at construction
/// and never replaced.
#[derive(Debug, Clone)]
pub struct RunContext {
    identity: RunIdentity,
    original: ReferenceImage,
    latest: Option<ReferenceImage>,
    log: Vec<StageRecord>,
}

impl RunContext {
    /// Starts a run from a validated original image.
    #[must_use]
    pub fn new(identity: RunIdentity, original: ReferenceImage) -> Self {
        Self {
            identity,
            original,
            latest: None,
            log: Vec::with_capacity(StageKind::COUNT),
        }
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the original photograph.
    #[must_use]
    pub fn original(&self) -> &ReferenceImage {
        &self.original
    }

    /// Returns the most recently produced stage image.
    #[must_use]
    pub fn latest(&self) -> Option<&ReferenceImage> {
        self.latest.as_ref()
    }

    /// Returns the reference set for the next stage.
    #[must_use]
    pub fn references(&self) -> ReferenceSet {
        match &self.latest {
            None => ReferenceSet::original_only(self.original.clone()),
            Some(previous) => ReferenceSet::with_previous(self.original.clone(), previous.clone()),
        }
    }

    /// Returns the stage allowed to run next.
    ///
    /// `None` once a stage has failed or all eight have produced.
    #[must_use]
    pub fn next_stage(&self) -> Option<StageKind> {
        match self.log.last() {
            None => Some(StageKind::Sketch),
            Some(record) if record.is_produced() => record.stage.next(),
            Some(_) => None,
        }
    }

    /// Returns true once a stage has failed.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.log.last().is_some_and(|record| !record.is_produced())
    }

    /// Returns true when all eight stages have produced.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.log.len() == StageKind::COUNT && self.log.iter().all(StageRecord::is_produced)
    }

    /// Records a stage result and returns the advanced context.
    #[must_use]
    pub fn advance(
        mut self,
        definition: &StageDefinition,
        result: StageResult,
        started_at: Timestamp,
        duration_ms: u64,
    ) -> Self {
        debug_assert_eq!(self.next_stage(), Some(definition.kind));

        let outcome = match result {
            StageResult::Produced { image, artifact } => {
                self.latest = Some(image);
                StageOutcome::Produced { artifact }
            }
            StageResult::Failed(error) => StageOutcome::Failed { error },
        };

        self.log.push(StageRecord {
            stage: definition.kind,
            position: definition.position(),
            name: definition.name.clone(),
            started_at,
            duration_ms,
            outcome,
        });
        self
    }

    /// Returns the run log so far.
    #[must_use]
    pub fn log(&self) -> &[StageRecord] {
        &self.log
    }

    /// Splits the context into its identity and log.
    #[must_use]
    pub fn into_parts(self) -> (RunIdentity, Vec<StageRecord>) {
        (self.identity, self.log)
    }
}
