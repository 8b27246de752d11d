use crate::models::ProviderName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No prompt configured for provider {provider}. Create a template-specific or active analysis prompt.")]
    NoPromptConfigured { provider: ProviderName },

    #[error("No adapter registered for provider {0}")]
    ProviderNotRegistered(ProviderName),

    #[error("{provider} call failed (criteria: {}): {message}", .criteria.join(", "))]
    ProviderCall {
        provider: ProviderName,
        criteria: Vec<String>,
        message: String,
    },

    #[error("Failed to parse model response as JSON. Snippet: {0}")]
    ParseError(String),

    #[error("Analysis response validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Attach the batch's criterion names to a provider failure so that
    /// logs and propagated errors identify the affected scope.
    pub fn with_criteria(self, names: &[String]) -> Self {
        match self {
            AnalysisError::ProviderCall {
                provider, message, ..
            } => AnalysisError::ProviderCall {
                provider,
                criteria: names.to_vec(),
                message,
            },
            other => other,
        }
    }

    /// Transient failures enter the fallback path; configuration and
    /// validation failures are terminal for the whole request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnalysisError::ProviderCall { .. } | AnalysisError::ParseError(_)
        )
    }
}
