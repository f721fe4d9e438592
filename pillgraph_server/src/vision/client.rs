//! Vision provider clients.
//!
//! Two providers are supported behind the [`VisionClient`] trait:
//! - **Gemini** — Google Generative Language API, `generateContent` with
//!   inline image data.
//! - **OpenRouter** — any OpenAI-compatible chat completions endpoint that
//!   accepts image content parts.
//!
//! Both return the model's raw text; fragment extraction happens in
//! [`super::extract`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::vision::LABEL_PROMPT;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// A provider that can analyze a medication label image.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Send the label image to the model and return its raw text output.
    ///
    /// `base64_data` is the bare base64 payload (no data-URL prefix).
    async fn analyze_label(&self, mime_type: &str, base64_data: &str)
        -> Result<String, AppError>;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

/// One request part: either prompt text or inline image data.
/// Serializes untagged as `{"text": ...}` / `{"inlineData": {...}}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

/// Google Generative Language API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout_secs: u64) -> Self {
        Self {
            api_key,
            model,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn analyze_label(
        &self,
        mime_type: &str,
        base64_data: &str,
    ) -> Result<String, AppError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text {
                        text: LABEL_PROMPT.to_string(),
                    },
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: mime_type.to_string(),
                            data: base64_data.to_string(),
                        },
                    },
                ],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::vision_failed(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::vision_failed(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::vision_failed(format!("Failed to parse Gemini response: {}", e)))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::vision_failed("Gemini returned no candidates"))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        if text.is_empty() {
            return Err(AppError::vision_failed("Gemini returned an empty response"));
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// OpenRouter (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
pub struct OpenRouterClient {
    api_key: String,
    api_base_url: String,
    model: String,
    client: Client,
}

impl OpenRouterClient {
    pub fn new(api_key: String, api_base_url: String, model: String, timeout_secs: u64) -> Self {
        let base_url = if api_base_url.is_empty() {
            OPENROUTER_API_BASE.to_string()
        } else {
            api_base_url
        };
        Self {
            api_key,
            api_base_url: base_url,
            model,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VisionClient for OpenRouterClient {
    async fn analyze_label(
        &self,
        mime_type: &str,
        base64_data: &str,
    ) -> Result<String, AppError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: LABEL_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", mime_type, base64_data),
                        },
                    },
                ],
            }],
        };

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::vision_failed(format!("OpenRouter request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::vision_failed(format!(
                "OpenRouter API error ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::vision_failed(format!("Failed to parse OpenRouter response: {}", e))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::vision_failed("OpenRouter returned no choices"))?;
        if choice.message.content.is_empty() {
            return Err(AppError::vision_failed(
                "OpenRouter returned an empty response",
            ));
        }
        Ok(choice.message.content)
    }
}
