//! Image generation backends.
//!
//! The runner only knows the [`ImageGenerator`] trait. A backend receives
//! the full prompt and one or two reference images and answers with at most
//! one image.

#[cfg(feature = "gemini")]
pub mod gemini;

use crate::core::{GeneratedImage, ReferenceImage};
use crate::errors::GenerationError;
use async_trait::async_trait;

#[cfg(feature = "gemini")]
pub use gemini::GeminiImageGenerator;

/// A generative image model.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns a short backend name for logs.
    fn name(&self) -> &str;

    /// Generates one image conditioned on `references`.
    ///
    /// `references` holds the original photograph, followed by the previous
    /// stage output for every stage after the first. Returns `Ok(None)` when
    /// the backend answered without image data.
    async fn generate(
        &self,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> Result<Option<GeneratedImage>, GenerationError>;
}
