//! Google Gemini provider implementation

use super::types::{Generation, Usage};
use super::{GenerationApi, LlmConfig, LlmError};
use crate::state_machine::Attachment;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Finish reason for a normally completed candidate
const FINISH_STOP: &str = "STOP";
const FINISH_UNSPECIFIED: &str = "FINISH_REASON_UNSPECIFIED";

/// Gemini service implementation.
///
/// Text-only prompts go to the text model, prompts with an image go to the
/// vision model.
pub struct GeminiService {
    client: Client,
    api_key: String,
    base_url: String,
    text_model: String,
    vision_model: String,
}

impl GeminiService {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    pub(crate) fn text_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::Text {
                    text: prompt.to_string(),
                }],
            }],
        }
    }

    /// Image first, then the prompt text
    pub(crate) fn multimodal_request(image: &Attachment, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: GeminiBlob {
                            mime_type: image.media_type().to_string(),
                            data: STANDARD.encode(image.bytes()),
                        },
                    },
                    GeminiPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        }
    }

    pub(crate) fn normalize_response(resp: GeminiResponse) -> Result<Generation, LlmError> {
        let usage = resp
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u64::from(u.prompt_token_count),
                output_tokens: u64::from(u.candidates_token_count),
            })
            .unwrap_or_default();

        let Some(candidate) = resp.candidates.into_iter().next() else {
            if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(LlmError::blocked(format!("Prompt was blocked: {reason}")));
            }
            // Nothing to show; the coordinator substitutes its placeholder
            return Ok(Generation {
                text: String::new(),
                finish_reason: None,
                usage,
            });
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != FINISH_STOP && reason != FINISH_UNSPECIFIED {
                return Err(LlmError::blocked(format!(
                    "Content generation stopped. Reason: {reason}"
                )));
            }
        }

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        GeminiPart::Text { text } => Some(text),
                        _ => None,
                    })
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(Generation {
            text,
            finish_reason: candidate.finish_reason,
            usage,
        })
    }

    async fn generate(&self, model: &str, request: &GeminiRequest) -> Result<Generation, LlmError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else if e.is_request() {
                    LlmError::network(format!("Request failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(gemini_response)
    }
}

/// Map a non-success HTTP status and body to a classified error
///
/// The status picks the kind; proxies often answer with HTML or plain text,
/// in which case the raw body becomes the message.
pub(crate) fn classify_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiErrorResponse>(body)
        .map_or_else(|_| body.trim().to_string(), |resp| resp.error.message);

    match status {
        400 => LlmError::invalid_request(message),
        401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
        429 => LlmError::rate_limit(message),
        500..=599 => LlmError::server_error(format!("Server error: {message}")),
        _ => LlmError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl GenerationApi for GeminiService {
    async fn generate_text(&self, prompt: &str) -> Result<Generation, LlmError> {
        self.generate(&self.text_model, &Self::text_request(prompt))
            .await
    }

    async fn generate_multimodal(
        &self,
        image: &Attachment,
        prompt: &str,
    ) -> Result<Generation, LlmError> {
        self.generate(&self.vision_model, &Self::multimodal_request(image, prompt))
            .await
    }

    fn model_id(&self) -> &str {
        &self.text_model
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    /// Function calls and other part kinds we do not request
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
