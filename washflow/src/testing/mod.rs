//! Testing utilities for washflow pipelines.
//!
//! This module provides:
//! - A scripted image generator that records its calls
//! - Image and stage fixtures
//! - Assertions over run reports

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_aborted_at, assert_artifacts_on_disk, assert_complete, assert_log_invariants,
};
pub use fixtures::{labelled_stages, solid_png, stage_definitions, write_photo};
pub use mocks::{RecordedCall, ScriptedGenerator, ScriptedResponse};
