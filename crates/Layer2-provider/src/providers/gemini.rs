//! Google Gemini backend (REST `generateContent`)

use crate::{
    error::{BackendError, BackendErrorKind},
    message::{Content, ContentRole, Part},
    r#trait::{
        BackendTool, FinishReason, GenerationOptions, GroundingCitation, ModelBackend,
        ModelRequest, ModelResponse,
    },
};
use async_trait::async_trait;
use counsel_foundation::config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use counsel_foundation::{ApiSettings, TokenUsage};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini backend
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Create from the `api` section of the config
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, BackendError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::Authentication,
                "No API key configured. Set GEMINI_API_KEY or api.apiKey in config.json.",
            )
        })?;

        Ok(Self {
            client: build_client(Duration::from_secs(settings.effective_timeout()))?,
            api_key,
            base_url: settings.effective_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Set custom base URL (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request(request: &ModelRequest) -> GeminiRequest {
        let contents = request.contents.iter().map(GeminiContent::from).collect();

        let tools = if request.options.tools.is_empty() {
            None
        } else {
            Some(request.options.tools.iter().map(GeminiTool::from).collect())
        };

        let system_instruction = request
            .system_instruction
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| GeminiSystemInstruction {
                parts: vec![GeminiPart::text(s.clone())],
            });

        GeminiRequest {
            contents,
            tools,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig::from(&request.options)),
        }
    }

    fn parse_response(api_response: GeminiResponse, model: &str) -> Result<ModelResponse, BackendError> {
        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage::new(u.total_token_count, u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        let Some(candidate) = api_response.candidates.into_iter().next() else {
            if let Some(reason) = api_response.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(BackendError::new(
                    BackendErrorKind::ContentFiltered,
                    format!("Prompt blocked: {}", reason),
                ));
            }
            return Err(BackendError::invalid_response("No candidates in response"));
        };

        let mut text = String::new();
        if let Some(content) = candidate.content {
            for part in content.parts {
                if let GeminiPart::Text { text: chunk, thought } = part {
                    if !thought {
                        text.push_str(&chunk);
                    }
                }
            }
        }

        let citations = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| match web.uri {
                        Some(uri) if !uri.is_empty() => Some(GroundingCitation {
                            title: web.title.filter(|t| !t.is_empty()),
                            uri,
                        }),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::MaxTokens,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                FinishReason::ContentFilter
            }
            _ => FinishReason::Other,
        };

        if text.is_empty() && finish_reason == FinishReason::ContentFilter {
            return Err(BackendError::new(
                BackendErrorKind::ContentFiltered,
                "Response withheld by safety filters",
            ));
        }

        Ok(ModelResponse {
            text,
            usage,
            citations,
            finish_reason,
            model: api_response.model_version.unwrap_or_else(|| model.to_string()),
        })
    }

    fn parse_error_response(status: u16, body: &str) -> BackendError {
        match serde_json::from_str::<GeminiErrorResponse>(body) {
            Ok(error_response) => {
                let error = error_response.error;
                BackendError::from_http_status(
                    error.code.unwrap_or(status),
                    error.status.as_deref(),
                    &error.message,
                )
            }
            Err(_) => BackendError::from_http_status(status, None, body),
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client, BackendError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::network(format!("Failed to create HTTP client: {}", e)))
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let body = Self::build_request(&request);
        let url = self.generate_url(&request.model);

        debug!(model = %request.model, contents = body.contents.len(), "Calling Gemini");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = Self::parse_error_response(status.as_u16(), &body);
            warn!(model = %request.model, "Gemini request failed: {}", error);
            return Err(error);
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::invalid_response(e.to_string()))?;

        Self::parse_response(api_response, &request.model)
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        thought: bool,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    /// Parts this backend does not use (function calls, code execution)
    Other(serde_json::Value),
}

impl GeminiPart {
    fn text(text: String) -> Self {
        GeminiPart::Text {
            text,
            thought: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<serde_json::Value>,
}

// Response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWebSource>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

// Error types
#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&Content> for GeminiContent {
    fn from(content: &Content) -> Self {
        let role = match content.role {
            ContentRole::User => "user",
            ContentRole::Model => "model",
        };

        let mut parts: Vec<GeminiPart> = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => GeminiPart::text(text.clone()),
                Part::InlineData { mime_type, data } => GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
            })
            .collect();

        if parts.is_empty() {
            parts.push(GeminiPart::text(String::new()));
        }

        GeminiContent {
            role: role.to_string(),
            parts,
        }
    }
}

impl From<&GenerationOptions> for GeminiGenerationConfig {
    fn from(options: &GenerationOptions) -> Self {
        GeminiGenerationConfig {
            max_output_tokens: options.max_output_tokens,
            temperature: Some(options.temperature),
            top_p: options.top_p,
        }
    }
}

impl From<&BackendTool> for GeminiTool {
    fn from(tool: &BackendTool) -> Self {
        match tool {
            BackendTool::GoogleSearch => GeminiTool {
                google_search: Some(serde_json::json!({})),
            },
        }
    }
}
