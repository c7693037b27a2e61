//! # Washflow
//!
//! Turns a photograph into a watercolor painting through eight fixed stages,
//! each one an image-generation call that sees the original photo and the
//! previous stage's output.
//!
//! Washflow provides:
//!
//! - **Sequential stage execution**: sketch through finish, failing fast
//! - **Immutable run context**: each stage result produces a new context value
//! - **Deterministic artifacts**: `stepN_<name>` files written atomically
//! - **Pluggable generators**: any [`providers::ImageGenerator`], Gemini included
//! - **Cancellation and timeouts**: per stage and per run
//! - **Structured logging**: every line of a run carries its `run_id`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use washflow::prelude::*;
//!
//! let generator = Arc::new(GeminiImageGenerator::new(GeminiConfig::from_env()?)?);
//! let runner = StagePipelineRunner::new(generator);
//!
//! let report = runner
//!     .run(RunRequest::new(PathBuf::from("photo.jpg"), "out"))
//!     .await?;
//! println!("{}", report.summary());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod stages;
pub mod storage;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{GeminiConfig, PromptConfig, RunnerConfig};
    pub use crate::context::{ReferenceSet, RunContext, RunIdentity};
    pub use crate::core::{
        GeneratedImage, ImageSource, OutputFormat, ReferenceImage, StageArtifact, StageKind,
        StageStatus,
    };
    pub use crate::errors::{
        ConfigError, GenerationError, InputError, PipelineError, StageError, StorageError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{run_pipeline, RunReport, RunRequest, RunStatus, StagePipelineRunner};
    #[cfg(feature = "gemini")]
    pub use crate::providers::GeminiImageGenerator;
    pub use crate::providers::ImageGenerator;
    pub use crate::stages::{StageDefinition, StageRecord, StageResult, StageSet};
    pub use crate::storage::{ArtifactStore, FsArtifactStore};
    pub use crate::utils::{generate_uuid, Timestamp};
}
