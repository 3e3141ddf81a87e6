/// LLM client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Callers depend on the `DocumentModel` trait so the extraction chain can be
/// driven by test doubles.
///
/// One call = one HTTP request. There is no retry loop here: the extraction
/// chain moves on to the next model instead of retrying the same one.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// An AI backend that can read a document and answer a prompt about it.
#[async_trait]
pub trait DocumentModel: Send + Sync {
    /// Issues exactly one request to `model` and returns the raw response text.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        document: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_tokens: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    pub output_tokens: u32,
}

impl GenerateResponse {
    /// Concatenates the text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_base: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl DocumentModel for LlmClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        document: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError> {
        let request_body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::Text { text: prompt },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: STANDARD.encode(document),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        if let Some(usage) = &parsed.usage {
            debug!(
                "Gemini call succeeded: model={model}, input_tokens={}, output_tokens={}",
                usage.prompt_tokens, usage.output_tokens
            );
        }

        parsed.text().ok_or(LlmError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) up to the first newline.
    let rest = match rest.find('\n') {
        Some(pos) if rest[..pos].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[pos + 1..],
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
