use crate::error::AnalysisError;
use crate::models::ProviderName;
use crate::provider::{
    build_http_client, provider_call_error, sanitize_api_key, status_error, GenerationConfig,
    ProviderAdapter,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Sent as the HTTP-Referer attribution header OpenRouter expects.
    pub referer: String,
    /// Sent as the X-Title attribution header.
    pub app_title: String,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            referer: "https://lessonlens.dev".to_string(),
            app_title: "LessonLens".to_string(),
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

    pub fn with_attribution(
        mut self,
        referer: impl Into<String>,
        app_title: impl Into<String>,
    ) -> Self {
        self.referer = referer.into();
        self.app_title = app_title.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct RouterRequest<'a> {
    model: &'a str,
    messages: Vec<RouterMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct RouterMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct RouterResponse {
    #[serde(default)]
    choices: Vec<RouterChoice>,
}

#[derive(Debug, Deserialize)]
struct RouterChoice {
    message: RouterResponseMessage,
}

#[derive(Debug, Deserialize)]
struct RouterResponseMessage {
    content: Option<String>,
}

#[derive(Debug)]
pub struct OpenRouterAdapter {
    config: OpenRouterConfig,
    client: reqwest::Client,
}

impl OpenRouterAdapter {
    pub fn new(mut config: OpenRouterConfig) -> Result<Self, AnalysisError> {
        config.api_key = sanitize_api_key(ProviderName::OpenRouter, &config.api_key);
        if config.api_key.is_empty() {
            return Err(AnalysisError::ConfigError(
                "OpenRouter API key not configured".to_string(),
            ));
        }
        let client = build_http_client(ProviderName::OpenRouter, config.timeout)?;
        Ok(Self { config, client })
    }

    async fn call(&self, prompt: &str, gen: &GenerationConfig) -> Result<String, AnalysisError> {
        let provider = ProviderName::OpenRouter;

        let body = RouterRequest {
            model: &self.config.model,
            messages: vec![RouterMessage {
                role: "user",
                content: prompt,
            }],
            temperature: gen.temperature,
            max_tokens: gen.max_output_tokens,
            response_format: gen.json_output.then(|| json!({"type": "json_object"})),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.app_title)
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_call_error(provider, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error(provider, response).await);
        }

        let envelope: RouterResponse = response
            .json()
            .await
            .map_err(|e| provider_call_error(provider, format!("malformed envelope: {}", e)))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(provider_call_error(provider, "no content in response"));
        }

        Ok(content)
    }
}

impl ProviderAdapter for OpenRouterAdapter {
    fn execute<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(self.call(prompt, config))
    }

    fn name(&self) -> ProviderName {
        ProviderName::OpenRouter
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
