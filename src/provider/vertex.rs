use crate::error::AnalysisError;
use crate::models::ProviderName;
use crate::provider::gemini::{
    extract_candidate_text, Content, GenerateContentRequest, GenerateContentResponse, Part,
    WireGenerationConfig,
};
use crate::provider::{
    build_http_client, provider_call_error, sanitize_api_key, status_error, GenerationConfig,
    ProviderAdapter,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";
pub const DEFAULT_VERTEX_MODEL: &str = "gemini-1.5-pro-001";

/// Vertex hosts the same model family as the Gemini adapter behind a
/// project-scoped endpoint; the wire envelope is shared.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    /// Overrides the computed endpoint base; used by tests.
    pub base_url: Option<String>,
}

impl VertexConfig {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: DEFAULT_VERTEX_LOCATION.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_VERTEX_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            base_url: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn endpoint(&self) -> String {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}-aiplatform.googleapis.com/v1", self.location),
        };
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent?key={}",
            base, self.project_id, self.location, self.model, self.api_key
        )
    }
}

#[derive(Debug)]
pub struct VertexAdapter {
    config: VertexConfig,
    client: reqwest::Client,
}

impl VertexAdapter {
    pub fn new(mut config: VertexConfig) -> Result<Self, AnalysisError> {
        config.api_key = sanitize_api_key(ProviderName::Vertex, &config.api_key);
        if config.project_id.trim().is_empty() || config.api_key.is_empty() {
            return Err(AnalysisError::ConfigError(
                "Vertex is not configured: project id and API key are required".to_string(),
            ));
        }
        let client = build_http_client(ProviderName::Vertex, config.timeout)?;
        Ok(Self { config, client })
    }

    async fn call(&self, prompt: &str, gen: &GenerationConfig) -> Result<String, AnalysisError> {
        let provider = ProviderName::Vertex;

        // Vertex responses are requested as JSON unconditionally; the
        // endpoint handles the mime type reliably.
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: WireGenerationConfig::from_config(gen, true),
        };

        let response = self
            .client
            .post(self.config.endpoint())
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

impl ProviderAdapter for VertexAdapter {
    fn execute<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(self.call(prompt, config))
    }

    fn name(&self) -> ProviderName {
        ProviderName::Vertex
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
