//! Stage definitions, default prompts and per-stage results.
//!
//! The pipeline always runs the same eight stages. What varies between runs
//! is the instruction text, the display names and the artifact stems, all of
//! which are plain data carried by a [`StageSet`].

mod definition;
pub mod prompts;
mod result;

pub use crate::core::StageKind;
pub use definition::{StageDefinition, StageSet};
pub use prompts::{effective_prompt, DEFAULT_SYSTEM_PROMPT};
pub use result::{StageOutcome, StageRecord, StageResult};
