//! Configuration for the runner, the Gemini backend and stage prompts.
//!
//! All types deserialize from JSON with defaults for every omitted field,
//! and offer `with_*` builders for programmatic use.

use crate::core::{OutputFormat, StageKind};
use crate::errors::{ConfigError, PipelineError};
use crate::stages::{StageDefinition, StageSet, DEFAULT_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the Gemini model.
pub const MODEL_ENV: &str = "WASHFLOW_MODEL";

/// Behaviour of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Encoding of persisted artifacts.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// JPEG quality, 1 to 100.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Upper bound for a single generation call.
    #[serde(default)]
    pub stage_timeout_seconds: Option<f64>,
    /// Upper bound for the whole run.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: Option<f64>,
    /// After a run, remove earlier files under stage filenames the run did not write.
    #[serde(default = "default_discard_stale")]
    pub discard_stale_artifacts: bool,
}

fn default_jpeg_quality() -> u8 {
    90
}

#[allow(clippy::unnecessary_wraps)]
fn default_run_timeout() -> Option<f64> {
    Some(1800.0)
}

fn default_discard_stale() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            jpeg_quality: default_jpeg_quality(),
            stage_timeout_seconds: None,
            run_timeout_seconds: default_run_timeout(),
            discard_stale_artifacts: default_discard_stale(),
        }
    }
}

impl RunnerConfig {
    /// Creates a runner configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the artifact encoding.
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Sets the JPEG quality.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Bounds each generation call.
    #[must_use]
    pub fn with_stage_timeout(mut self, seconds: f64) -> Self {
        self.stage_timeout_seconds = Some(seconds);
        self
    }

    /// Bounds the whole run.
    #[must_use]
    pub fn with_run_timeout(mut self, seconds: f64) -> Self {
        self.run_timeout_seconds = Some(seconds);
        self
    }

    /// Removes the run deadline.
    #[must_use]
    pub fn without_run_timeout(mut self) -> Self {
        self.run_timeout_seconds = None;
        self
    }

    /// Controls stale artifact removal after a run.
    #[must_use]
    pub fn with_discard_stale_artifacts(mut self, discard: bool) -> Self {
        self.discard_stale_artifacts = discard;
        self
    }

    /// JPEG quality clamped to the encoder's range.
    #[must_use]
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }

    /// Gets the per-stage timeout as a Duration.
    ///
    /// Non-positive or non-finite values mean no timeout.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_seconds.and_then(positive_duration)
    }

    /// Gets the run timeout as a Duration.
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_seconds.and_then(positive_duration)
    }
}

fn positive_duration(seconds: f64) -> Option<Duration> {
    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

/// Connection settings for the Gemini image backend.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: f64,
}

fn default_model() -> String {
    "gemini-2.0-flash-preview-image-generation".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_timeout() -> f64 {
    300.0
}

impl GeminiConfig {
    /// Creates a configuration with the given key and default endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_request_timeout(),
        }
    }

    /// Reads `GEMINI_API_KEY` and, if set, `WASHFLOW_MODEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(API_KEY_ENV.to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        Ok(config)
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        positive_duration(self.timeout_seconds)
    }

    /// Returns the `generateContent` endpoint for the configured model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Caller-editable instructions, loaded from JSON.
///
/// ```json
/// {
///   "system_prompt": "You are a watercolor painter.",
///   "stages": [
///     { "stage": "shadow", "prompt": "Deepen the shadows." }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Instruction prepended to every stage prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Per-stage patches applied to the default watercolor stages.
    #[serde(default)]
    pub stages: Vec<StageOverride>,
}

/// Patch for one stage definition. Omitted fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOverride {
    /// The stage being patched.
    pub stage: StageKind,
    /// Replacement instruction text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Replacement display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement artifact stem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_stem: Option<String>,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            stages: Vec::new(),
        }
    }
}

impl PromptConfig {
    /// Returns the full default configuration, with every stage spelled out.
    #[must_use]
    pub fn defaults() -> Self {
        let stages = StageSet::watercolor()
            .into_vec()
            .into_iter()
            .map(|definition| StageOverride {
                stage: definition.kind,
                prompt: Some(definition.prompt_template),
                name: Some(definition.name),
                output_stem: Some(definition.output_stem),
            })
            .collect();

        Self {
            system_prompt: default_system_prompt(),
            stages,
        }
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies the overrides to the default stages and validates the result.
    pub fn stage_set(&self) -> Result<StageSet, ConfigError> {
        let mut definitions: Vec<StageDefinition> = StageSet::watercolor().into_vec();

        for patch in &self.stages {
            let slot = &mut definitions[usize::from(patch.stage.position()) - 1];
            if let Some(prompt) = &patch.prompt {
                slot.prompt_template.clone_from(prompt);
            }
            if let Some(name) = &patch.name {
                slot.name.clone_from(name);
            }
            if let Some(stem) = &patch.output_stem {
                slot.output_stem.clone_from(stem);
            }
        }

        let set = StageSet::new(definitions).map_err(PipelineError::from)?;
        Ok(set)
    }
}
