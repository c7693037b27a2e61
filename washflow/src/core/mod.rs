//! Core domain model types for washflow.
//!
//! This module contains the fundamental values used throughout the crate:
//! - Stage identity and status enums
//! - Image values exchanged with generators and stores
//! - The persisted stage artifact

mod artifact;
mod image;
mod status;

pub use self::image::{GeneratedImage, ImageSource, OutputFormat, ReferenceImage};
pub use artifact::StageArtifact;
pub use status::{StageKind, StageStatus};
