//! Scripted image generator for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::core::{GeneratedImage, ReferenceImage};
use crate::errors::GenerationError;
use crate::providers::ImageGenerator;
use crate::testing::fixtures::solid_png;

/// What a [`ScriptedGenerator`] does on one call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return a fresh solid-color PNG, distinct for every call.
    Image,
    /// Return the given payload.
    Payload(GeneratedImage),
    /// Answer without image data.
    NoImage,
    /// Fail the call.
    Error(GenerationError),
    /// Never answer.
    Hang,
}

/// One recorded call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The full prompt.
    pub prompt: String,
    /// The reference images, in order.
    pub references: Vec<ReferenceImage>,
}

/// A generator that replays a script and records every call.
///
/// Calls beyond the end of the script use the fallback response, which is
/// [`ScriptedResponse::Image`] unless changed.
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedGenerator {
    /// Creates a generator that plays `script` and then succeeds.
    #[must_use]
    pub fn new(script: Vec<ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: ScriptedResponse::Image,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a generator that succeeds on every call.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Succeeds until the call at one-based `position`, which gets `response`.
    #[must_use]
    pub fn failing_at(position: u8, response: ScriptedResponse) -> Self {
        let mut script = vec![ScriptedResponse::Image; usize::from(position.saturating_sub(1))];
        script.push(response);
        Self::new(script)
    }

    /// Sets the response used once the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, fallback: ScriptedResponse) -> Self {
        self.fallback = fallback;
        self
    }

    /// Returns every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                references: references.to_vec(),
            });
            calls.len()
        };

        let response = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match response {
            ScriptedResponse::Image => {
                let shade = u8::try_from(index * 29 % 256).unwrap_or_default();
                let png = solid_png(8, 6, [shade, 255 - shade, 128]);
                Ok(Some(GeneratedImage::new(png).with_mime_type("image/png")))
            }
            ScriptedResponse::Payload(image) => Ok(Some(image)),
            ScriptedResponse::NoImage => Ok(None),
            ScriptedResponse::Error(err) => Err(err),
            ScriptedResponse::Hang => std::future::pending().await,
        }
    }
}
