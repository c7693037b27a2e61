//! Gemini `generateContent` backend.

use crate::config::GeminiConfig;
use crate::core::{GeneratedImage, ReferenceImage};
use crate::errors::GenerationError;
use crate::providers::ImageGenerator;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

const RESPONSE_MODALITIES: [&str; 2] = ["TEXT", "IMAGE"];

/// Image generator backed by the Gemini HTTP API.
#[derive(Debug, Clone)]
pub struct GeminiImageGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiImageGenerator {
    /// Creates a generator. Fails if the API key is empty.
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key is empty".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        references: &[ReferenceImage],
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        let body = build_request(prompt, references);
        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            references = references.len(),
            reference_bytes = references.iter().map(ReferenceImage::len).sum::<usize>(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_message(&payload),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&payload)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        extract_image(parsed)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: OutgoingInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct OutgoingInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: [&'static str; 2],
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<IncomingInlineData>,
}

#[derive(Debug, Deserialize)]
struct IncomingInlineData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

/// The prompt comes first, then each reference in order.
fn build_request<'a>(
    prompt: &'a str,
    references: &'a [ReferenceImage],
) -> GenerateContentRequest<'a> {
    let mut parts = Vec::with_capacity(references.len() + 1);
    parts.push(RequestPart::Text { text: prompt });
    parts.extend(references.iter().map(|image| RequestPart::Image {
        inline_data: OutgoingInlineData {
            mime_type: image.mime_type(),
            data: STANDARD.encode(image.bytes()),
        },
    }));

    GenerateContentRequest {
        contents: vec![RequestContent { role: "user", parts }],
        generation_config: GenerationConfig {
            response_modalities: RESPONSE_MODALITIES,
        },
    }
}

/// Returns the first inline image of the first candidate.
fn extract_image(
    response: GenerateContentResponse,
) -> Result<Option<GeneratedImage>, GenerationError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        debug!(feedback = ?response.prompt_feedback, "Response has no candidates");
        return Ok(None);
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut image = None;
    for part in parts {
        if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
            debug!(text = %text, "Model returned text");
        }
        if image.is_none() {
            image = part.inline_data;
        }
    }

    let Some(inline) = image else {
        debug!(finish_reason = ?candidate.finish_reason, "Response has no image part");
        return Ok(None);
    };

    let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
        GenerationError::MalformedResponse(format!("invalid base64 image data: {e}"))
    })?;

    let generated = GeneratedImage::new(bytes);
    Ok(Some(match inline.mime_type {
        Some(mime) => generated.with_mime_type(mime),
        None => generated,
    }))
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}
