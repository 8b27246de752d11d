use crate::error::AnalysisError;
use crate::models::ProviderName;
use crate::provider::{
    build_http_client, provider_call_error, sanitize_api_key, status_error, GenerationConfig,
    ProviderAdapter,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The v1beta endpoint serves the 1.5 aliases only under their `-latest`
/// names; normalize so either spelling works.
pub(crate) fn normalize_model(model: &str) -> String {
    match model {
        "gemini-1.5-pro" | "gemini-1.5-flash" => format!("{}-latest", model),
        other => other.to_string(),
    }
}

// Request/response envelope shared with the Vertex adapter, which hosts the
// same model family behind a different endpoint.

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    pub generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    pub role: &'a str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireGenerationConfig {
    pub temperature: f64,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "topP")]
    pub top_p: f64,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<&'static str>,
}

impl WireGenerationConfig {
    pub fn from_config(gen: &GenerationConfig, force_json: bool) -> Self {
        Self {
            temperature: gen.temperature,
            top_k: gen.top_k,
            top_p: gen.top_p,
            max_output_tokens: gen.max_output_tokens,
            response_mime_type: (force_json || gen.json_output).then_some("application/json"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatePart {
    pub text: Option<String>,
}

/// Join candidate part text into one response string, warning when the
/// model stopped at its output ceiling (the text is likely truncated and
/// will fail parsing downstream).
pub(crate) fn extract_candidate_text(
    provider: ProviderName,
    envelope: GenerateContentResponse,
) -> Result<String, AnalysisError> {
    let mut chunks = Vec::new();
    for candidate in &envelope.candidates {
        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            tracing::warn!(provider = %provider, "finishReason=MAX_TOKENS, output likely truncated");
        }
        if let Some(content) = &candidate.content {
            for part in &content.parts {
                if let Some(text) = &part.text {
                    chunks.push(text.as_str());
                }
            }
        }
    }

    let joined = chunks.join("\n");
    if joined.trim().is_empty() {
        return Err(provider_call_error(provider, "no text in any candidate"));
    }
    Ok(joined)
}

pub struct GeminiAdapter {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(mut config: GeminiConfig) -> Result<Self, AnalysisError> {
        config.api_key = sanitize_api_key(ProviderName::Gemini, &config.api_key);
        if config.api_key.is_empty() {
            return Err(AnalysisError::ConfigError(
                "Gemini API key not configured".to_string(),
            ));
        }
        config.model = normalize_model(&config.model);
        let client = build_http_client(ProviderName::Gemini, config.timeout)?;
        Ok(Self { config, client })
    }

    async fn call(&self, prompt: &str, gen: &GenerationConfig) -> Result<String, AnalysisError> {
        let provider = ProviderName::Gemini;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: WireGenerationConfig::from_config(gen, false),
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_call_error(provider, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error(provider, response).await);
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| provider_call_error(provider, format!("malformed envelope: {}", e)))?;

        extract_candidate_text(provider, envelope)
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn execute<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(self.call(prompt, config))
    }

    fn name(&self) -> ProviderName {
        ProviderName::Gemini
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
