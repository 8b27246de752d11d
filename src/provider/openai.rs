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

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// One explicit config object per adapter instance; nothing is read from
/// ambient process state at call time.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Optional system message prepended to every call.
    pub system_preamble: Option<String>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            system_preamble: None,
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

    pub fn with_system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = Some(preamble.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug)]
pub struct OpenAiAdapter {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiAdapter {
    pub fn new(mut config: OpenAiConfig) -> Result<Self, AnalysisError> {
        config.api_key = sanitize_api_key(ProviderName::OpenAi, &config.api_key);
        if config.api_key.is_empty() {
            return Err(AnalysisError::ConfigError(
                "OpenAI API key not configured".to_string(),
            ));
        }
        let client = build_http_client(ProviderName::OpenAi, config.timeout)?;
        Ok(Self { config, client })
    }

    async fn call(&self, prompt: &str, gen: &GenerationConfig) -> Result<String, AnalysisError> {
        let provider = ProviderName::OpenAi;

        let mut messages = Vec::new();
        if let Some(preamble) = &self.config.system_preamble {
            messages.push(ChatMessage {
                role: "system",
                content: preamble,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: gen.temperature,
            top_p: gen.top_p,
            max_tokens: gen.max_output_tokens,
            response_format: gen.json_output.then(|| json!({"type": "json_object"})),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_call_error(provider, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error(provider, response).await);
        }

        let envelope: ChatCompletionResponse = response
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

impl ProviderAdapter for OpenAiAdapter {
    fn execute<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(self.call(prompt, config))
    }

    fn name(&self) -> ProviderName {
        ProviderName::OpenAi
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
