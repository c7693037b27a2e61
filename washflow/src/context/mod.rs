//! Per-run context.
//!
//! This module provides:
//! - The run identity used for correlation
//! - The immutable context threaded from stage to stage
//! - The reference set handed to each generation call

mod identity;
mod run;

pub use identity::RunIdentity;
pub use run::{ReferenceSet, RunContext};
