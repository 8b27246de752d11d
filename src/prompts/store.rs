use crate::error::AnalysisError;
use crate::models::ProviderName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Versioned prompt text with placeholder tokens. At most one template per
/// (provider, name) should be active in a store at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: u64,
    pub provider: ProviderName,
    pub name: String,
    pub version: u32,
    pub text: String,
    pub active: bool,
}

/// Template/prompt lookup seam. The real store lives outside this core
/// (database-backed in deployments); the engine only needs these two reads.
pub trait PromptStore: Send + Sync {
    /// Prompt explicitly assigned to an evaluation template for a provider.
    fn template_prompt(&self, template_id: u64, provider: ProviderName) -> Option<PromptTemplate>;

    /// Active default prompt for a provider and prompt name.
    fn active_prompt(&self, provider: ProviderName, name: &str) -> Option<PromptTemplate>;
}

/// Resolution order: template-specific assignment first, then the active
/// default, otherwise the request cannot proceed.
pub fn resolve_prompt(
    store: &dyn PromptStore,
    provider: ProviderName,
    template_id: Option<u64>,
    default_name: &str,
) -> Result<PromptTemplate, AnalysisError> {
    if let Some(id) = template_id {
        if let Some(prompt) = store.template_prompt(id, provider) {
            tracing::debug!(
                provider = %provider,
                template_id = id,
                version = prompt.version,
                "using template-specific prompt"
            );
            return Ok(prompt);
        }
    }

    match store.active_prompt(provider, default_name) {
        Some(prompt) => {
            tracing::debug!(
                provider = %provider,
                name = default_name,
                version = prompt.version,
                "using default active prompt"
            );
            Ok(prompt)
        }
        None => Err(AnalysisError::NoPromptConfigured { provider }),
    }
}

/// Sanity checks on template text: length bounds and balanced placeholder
/// braces. Returns the list of issues; empty means the template is usable.
pub fn validate_template(text: &str) -> Vec<String> {
    let mut issues = Vec::new();

    if text.len() < 100 {
        issues.push("Prompt template is too short (minimum 100 characters)".to_string());
    }
    if text.len() > 50_000 {
        issues.push("Prompt template is too long (maximum 50,000 characters)".to_string());
    }

    let open = text.matches("{{").count();
    let close = text.matches("}}").count();
    if open != close {
        issues.push("Unclosed template variables detected".to_string());
    }

    issues
}

/// Simple in-memory store for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryPromptStore {
    prompts: Vec<PromptTemplate>,
    // (template_id, provider) -> prompt id
    assignments: HashMap<(u64, ProviderName), u64>,
}

impl InMemoryPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prompt. Activating one deactivates any other prompt with
    /// the same (provider, name) so the single-active invariant holds.
    pub fn insert(&mut self, prompt: PromptTemplate) {
        if prompt.active {
            for existing in &mut self.prompts {
                if existing.provider == prompt.provider && existing.name == prompt.name {
                    existing.active = false;
                }
            }
        }
        self.prompts.push(prompt);
    }

    /// Assign a stored prompt to an evaluation template for one provider,
    /// superseding the active default for requests naming that template.
    pub fn assign_to_template(
        &mut self,
        template_id: u64,
        provider: ProviderName,
        prompt_id: u64,
    ) {
        self.assignments.insert((template_id, provider), prompt_id);
    }
}

impl PromptStore for InMemoryPromptStore {
    fn template_prompt(&self, template_id: u64, provider: ProviderName) -> Option<PromptTemplate> {
        let prompt_id = self.assignments.get(&(template_id, provider))?;
        self.prompts.iter().find(|p| p.id == *prompt_id).cloned()
    }

    fn active_prompt(&self, provider: ProviderName, name: &str) -> Option<PromptTemplate> {
        self.prompts
            .iter()
            .find(|p| p.provider == provider && p.name == name && p.active)
            .cloned()
    }
}
