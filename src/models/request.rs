use crate::models::Criterion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of interchangeable analysis backends. Adding a provider means
/// adding a variant and an adapter, never branching inside orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    OpenAi,
    Gemini,
    Vertex,
    OpenRouter,
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderName::OpenAi => "openai",
            ProviderName::Gemini => "gemini",
            ProviderName::Vertex => "vertex",
            ProviderName::OpenRouter => "openrouter",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderName::OpenAi),
            "gemini" => Ok(ProviderName::Gemini),
            "vertex" => Ok(ProviderName::Vertex),
            "openrouter" => Ok(ProviderName::OpenRouter),
            other => Err(format!("Unsupported provider '{}'", other)),
        }
    }
}

/// Class/teacher metadata interpolated into prompts. Absent fields render
/// with "Unknown ..." fallbacks rather than leaking placeholder syntax.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub teacher_name: Option<String>,
    pub class_name: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub template_name: Option<String>,
}

impl AnalysisContext {
    pub fn teacher_name(&self) -> &str {
        self.teacher_name.as_deref().unwrap_or("Unknown Teacher")
    }

    pub fn class_name(&self) -> &str {
        self.class_name.as_deref().unwrap_or("Unknown Class")
    }

    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("Unknown Subject")
    }

    pub fn grade(&self) -> &str {
        self.grade.as_deref().unwrap_or("Unknown Grade")
    }

    pub fn template_name(&self) -> &str {
        self.template_name.as_deref().unwrap_or("Unknown Template")
    }
}

/// Pre-computed delivery evidence (pause/timing metrics) rendered into the
/// prompt when the template asks for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBlocks {
    pub wait_time_metrics: Option<String>,
    pub timing_section: Option<String>,
}

impl EvidenceBlocks {
    pub fn wait_time_metrics(&self) -> &str {
        self.wait_time_metrics
            .as_deref()
            .unwrap_or("No wait time metrics available")
    }

    pub fn timing_section(&self) -> &str {
        self.timing_section
            .as_deref()
            .unwrap_or("No timing metrics available")
    }
}

/// One analysis invocation. Created per call and discarded once a scored
/// result or terminal error is produced; nothing survives across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub transcript: String,
    pub criteria: Vec<Criterion>,
    pub context: AnalysisContext,
    #[serde(default)]
    pub evidence: EvidenceBlocks,
    pub provider: ProviderName,
    pub template_id: Option<u64>,
}

impl AnalysisRequest {
    pub fn new(
        transcript: impl Into<String>,
        criteria: Vec<Criterion>,
        provider: ProviderName,
    ) -> Self {
        Self {
            transcript: transcript.into(),
            criteria,
            context: AnalysisContext::default(),
            evidence: EvidenceBlocks::default(),
            provider,
            template_id: None,
        }
    }

    pub fn with_context(mut self, context: AnalysisContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_evidence(mut self, evidence: EvidenceBlocks) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_template_id(mut self, template_id: u64) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn criterion_names(&self) -> Vec<String> {
        self.criteria.iter().map(|c| c.name.clone()).collect()
    }
}
