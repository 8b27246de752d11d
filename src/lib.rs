//! Multi-provider analysis engine for classroom transcripts.
//!
//! Scores a lesson transcript against a weighted rubric by driving one of
//! several LLM backends through a uniform adapter interface. The pipeline
//! resolves a prompt template, batches criteria, calls the provider, recovers
//! JSON from messy model output, and degrades gracefully: a failed batch is
//! retried per criterion, and a criterion that still cannot be scored gets a
//! placeholder so every request yields a complete, scored result.
//!
//! ```no_run
//! use std::sync::Arc;
//! use lessonlens::{
//!     AnalysisEngine, AnalysisRequest, Criterion, GeminiAdapter, GeminiConfig,
//!     InMemoryPromptStore, ProviderName, PromptTemplate,
//! };
//!
//! # async fn run() -> Result<(), lessonlens::AnalysisError> {
//! let mut store = InMemoryPromptStore::new();
//! store.insert(PromptTemplate {
//!     id: 1,
//!     provider: ProviderName::Gemini,
//!     name: "analysis_prompt".to_string(),
//!     version: 1,
//!     text: "Analyze this lesson: {{TRANSCRIPT_TEXT}}\nCriteria:\n{{CRITERIA_LIST}}\nReturn JSON.".to_string(),
//!     active: true,
//! });
//!
//! let adapter = GeminiAdapter::new(GeminiConfig::new("api-key"))?;
//! let engine = AnalysisEngine::new(Arc::new(store)).register_adapter(Arc::new(adapter));
//!
//! let request = AnalysisRequest::new(
//!     "Teacher: What do we know about cells? ...",
//!     vec![Criterion::new("Wait Time", 40.0), Criterion::new("Questioning", 60.0)],
//!     ProviderName::Gemini,
//! );
//! let result = engine.analyze(&request).await?;
//! println!("overall: {}", result.overall_score);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod error;
pub mod models;
pub mod prompts;
pub mod provider;

pub use analyzer::{AnalysisEngine, EngineOptions};
pub use error::AnalysisError;
pub use models::{
    AggregateAnalysis, AnalysisContext, AnalysisRequest, Criterion, EvidenceBlocks, ProviderName,
    ScoredResult,
};
pub use prompts::{InMemoryPromptStore, OutputMode, PromptStore, PromptTemplate};
pub use provider::{
    GeminiAdapter, GeminiConfig, GenerationConfig, OpenAiAdapter, OpenAiConfig, OpenRouterAdapter,
    OpenRouterConfig, ProviderAdapter, VertexAdapter, VertexConfig,
};
