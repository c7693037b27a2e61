//! Pipeline execution.
//!
//! This module provides:
//! - The run request and the sequential stage runner
//! - The run report with its terminal status
//! - A one-call convenience entry point

#[cfg(test)]
mod integration_tests;
mod report;
mod runner;

pub use report::{RunReport, RunStatus};
pub use runner::{run_pipeline, RunRequest, StagePipelineRunner};
