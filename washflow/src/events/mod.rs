//! Lifecycle events emitted by the pipeline runner.
//!
//! Each runner owns its sink; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// A run was accepted and its inputs validated.
pub const RUN_STARTED: &str = "run.started";
/// A stage is about to call the generator.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage persisted its artifact.
pub const STAGE_PRODUCED: &str = "stage.produced";
/// A stage failed; the run stops.
pub const STAGE_FAILED: &str = "stage.failed";
/// All eight stages produced.
pub const RUN_COMPLETED: &str = "run.completed";
/// The run stopped at a failed stage.
pub const RUN_ABORTED: &str = "run.aborted";
