// Provider adapters - one concrete variant per backend behind a uniform
// execute() contract. Adapters shape requests and unwrap envelopes; they
// never retry. Retry policy lives in the orchestrator.

pub mod gemini;
pub mod openai;
pub mod openrouter;
pub mod vertex;

pub use gemini::{GeminiAdapter, GeminiConfig};
pub use openai::{OpenAiAdapter, OpenAiConfig};
pub use openrouter::{OpenRouterAdapter, OpenRouterConfig};
pub use vertex::{VertexAdapter, VertexConfig};

use crate::error::AnalysisError;
use crate::models::ProviderName;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const MIN_OUTPUT_TOKENS: u32 = 256;
pub const MAX_OUTPUT_TOKENS: u32 = 32_768;

/// Generation parameters passed to every adapter. Setters clamp to the
/// ranges the backends accept, so a config is always sendable as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
    /// Structured-output hint: ask the backend for a JSON-typed response
    /// where its API supports one.
    pub json_output: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 16_384,
            json_output: false,
        }
    }
}

impl GenerationConfig {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k.clamp(1, 100);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens.clamp(MIN_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS);
        self
    }

    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    /// Config for the per-criterion retry pass: structured output forced on
    /// and a larger output ceiling than the batch attempt, since truncated
    /// batch responses are the most common failure being recovered.
    pub fn for_retry(&self) -> Self {
        let mut retry = self.clone();
        retry.json_output = true;
        retry.max_output_tokens = self
            .max_output_tokens
            .saturating_mul(2)
            .clamp(MIN_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS);
        retry
    }
}

/// Uniform adapter contract: one model call per execute(). All failure
/// conditions (network, status, empty body, malformed envelope, timeout)
/// surface as `AnalysisError::ProviderCall`.
pub trait ProviderAdapter: Send + Sync {
    fn execute<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>>;

    fn name(&self) -> ProviderName;

    fn timeout(&self) -> Duration;
}

/// API keys never legitimately contain whitespace; stray newlines from
/// copy-pasted env files cause opaque 401s, so strip them up front.
pub(crate) fn sanitize_api_key(provider: ProviderName, raw: &str) -> String {
    let sanitized: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if !raw.is_empty() && sanitized != raw {
        tracing::warn!(
            provider = %provider,
            "API key contained whitespace and was sanitized"
        );
    }
    sanitized
}

/// Build the HTTP client an adapter uses for every call, with the bounded
/// per-request timeout baked in.
pub(crate) fn build_http_client(
    provider: ProviderName,
    timeout: Duration,
) -> Result<reqwest::Client, AnalysisError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            AnalysisError::ConfigError(format!("failed to build {} HTTP client: {}", provider, e))
        })
}

pub(crate) fn provider_call_error(
    provider: ProviderName,
    message: impl Into<String>,
) -> AnalysisError {
    AnalysisError::ProviderCall {
        provider,
        criteria: Vec::new(),
        message: message.into(),
    }
}

/// Map a non-success HTTP status plus a bounded body snippet to the uniform
/// provider failure.
pub(crate) async fn status_error(
    provider: ProviderName,
    response: reqwest::Response,
) -> AnalysisError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    provider_call_error(provider, format!("HTTP {}: {}", status.as_u16(), snippet))
}
