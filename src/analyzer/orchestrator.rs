use crate::analyzer::aggregator::{
    loose_key, merge_fragments, placeholder_entry, synthesize_coaching_summary,
};
use crate::analyzer::batcher::{chunk_criteria, DEFAULT_BATCH_SIZE};
use crate::analyzer::parser::extract_json;
use crate::analyzer::scoring::calculate_weighted_score;
use crate::analyzer::validator::validate_analysis;
use crate::error::AnalysisError;
use crate::models::{AnalysisRequest, BatchResult, Criterion, ProviderName, ScoredResult};
use crate::prompts::{render_prompt, resolve_prompt, OutputMode, PromptStore, RenderOptions};
use crate::provider::{GenerationConfig, ProviderAdapter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_PROMPT_NAME: &str = "analysis_prompt";

/// Tuning knobs for one engine instance. All requests through the engine
/// share them.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub batch_size: usize,
    /// Send every criterion in a single call instead of batching.
    pub single_shot: bool,
    /// Fail the whole request on the first batch failure instead of
    /// retrying per criterion.
    pub disable_fallback: bool,
    pub output_mode: OutputMode,
    pub default_prompt_name: String,
    pub generation: GenerationConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            single_shot: false,
            disable_fallback: false,
            output_mode: OutputMode::default(),
            default_prompt_name: DEFAULT_PROMPT_NAME.to_string(),
            generation: GenerationConfig::default(),
        }
    }
}

/// Drives one analysis request end to end: prompt resolution, batching,
/// provider calls, fallback, aggregation, validation, and scoring.
///
/// Batches run sequentially. A failed batch degrades to one retry per
/// criterion with a tighter output schema and a larger output ceiling; a
/// criterion whose retry also fails receives a placeholder score so the
/// request still completes.
pub struct AnalysisEngine {
    prompts: Arc<dyn PromptStore>,
    adapters: HashMap<ProviderName, Arc<dyn ProviderAdapter>>,
    options: EngineOptions,
}

impl AnalysisEngine {
    pub fn new(prompts: Arc<dyn PromptStore>) -> Self {
        Self {
            prompts,
            adapters: HashMap::new(),
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn register_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.name(), adapter);
        self
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<ScoredResult, AnalysisError> {
        if request.criteria.is_empty() {
            return Err(AnalysisError::ValidationError(
                "request contains no criteria".to_string(),
            ));
        }

        let provider = request.provider;
        let adapter = self
            .adapters
            .get(&provider)
            .ok_or(AnalysisError::ProviderNotRegistered(provider))?;

        let prompt = resolve_prompt(
            self.prompts.as_ref(),
            provider,
            request.template_id,
            &self.options.default_prompt_name,
        )?;

        let batches = chunk_criteria(
            &request.criteria,
            self.options.batch_size,
            self.options.single_shot,
        );
        info!(
            provider = %provider,
            criteria = request.criteria.len(),
            batches = batches.len(),
            "starting analysis"
        );

        let mut fragments: Vec<Value> = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            debug!(
                batch = index + 1,
                criteria = ?batch.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "executing batch"
            );
            let batch_fragments = self
                .run_batch(adapter.as_ref(), &prompt.text, request, batch)
                .await?;
            fragments.extend(batch_fragments);
        }

        let mut analysis = merge_fragments(&request.criteria, &fragments);
        if analysis.coaching_summary.trim().is_empty() {
            warn!(provider = %provider, "no coaching summary from any batch, synthesizing");
            analysis.coaching_summary = synthesize_coaching_summary(&analysis, &request.context);
        }

        validate_analysis(&analysis)?;

        let (overall_score, skipped_criteria) =
            calculate_weighted_score(&request.criteria, &analysis);
        info!(
            provider = %provider,
            overall_score,
            skipped = skipped_criteria.len(),
            "analysis complete"
        );

        Ok(ScoredResult {
            analysis,
            overall_score,
            skipped_criteria,
        })
    }

    /// One batch attempt plus, when needed, the per-criterion fallback.
    /// Returns the JSON fragments this batch contributed.
    async fn run_batch(
        &self,
        adapter: &dyn ProviderAdapter,
        template: &str,
        request: &AnalysisRequest,
        batch: &[Criterion],
    ) -> Result<Vec<Value>, AnalysisError> {
        let names: Vec<String> = batch.iter().map(|c| c.name.clone()).collect();
        let options = RenderOptions::batch(self.options.single_shot, self.options.output_mode);
        let prompt = render_prompt(
            template,
            &request.transcript,
            batch,
            &request.context,
            &request.evidence,
            &options,
        );

        let result = match self.attempt(adapter, &prompt, &self.options.generation).await {
            Ok((raw, parsed)) => BatchResult::succeeded(names, raw, parsed),
            Err(err) if err.is_transient() && !self.options.disable_fallback => {
                warn!(
                    provider = %adapter.name(),
                    criteria = ?names,
                    error = %err,
                    "batch failed, falling back to per-criterion calls"
                );
                BatchResult::failed(names)
            }
            Err(err) => return Err(err.with_criteria(&names)),
        };

        let Some(fragment) = result.parsed else {
            // Whole batch failed: one retry per criterion, placeholders for
            // anything still unusable.
            let mut fragments = Vec::with_capacity(batch.len());
            for criterion in batch {
                fragments.push(self.retry_criterion(adapter, template, request, criterion).await);
            }
            return Ok(fragments);
        };

        let mut fragments = vec![fragment];
        let missing = missing_criteria(batch, &fragments[0]);
        if !missing.is_empty() {
            if self.options.disable_fallback {
                warn!(
                    provider = %adapter.name(),
                    missing = ?missing.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "batch response omitted criteria and fallback is disabled"
                );
            } else {
                warn!(
                    provider = %adapter.name(),
                    missing = ?missing.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "batch response omitted criteria, retrying them individually"
                );
                for criterion in missing {
                    fragments.push(self.retry_criterion(adapter, template, request, criterion).await);
                }
            }
        }
        Ok(fragments)
    }

    /// One retry for one criterion. Never fails: an unusable retry yields
    /// the placeholder entry so the overall request can still complete.
    async fn retry_criterion(
        &self,
        adapter: &dyn ProviderAdapter,
        template: &str,
        request: &AnalysisRequest,
        criterion: &Criterion,
    ) -> Value {
        let single = std::slice::from_ref(criterion);
        let prompt = render_prompt(
            template,
            &request.transcript,
            single,
            &request.context,
            &request.evidence,
            &RenderOptions::per_criterion_retry(),
        );
        let config = self.options.generation.for_retry();

        match self.attempt(adapter, &prompt, &config).await {
            Ok((_, fragment)) => {
                if let Some(entry) = criterion_entry(&fragment, &criterion.name) {
                    debug!(criterion = %criterion.name, "per-criterion retry succeeded");
                    return json!({ "detailed_feedback": { (criterion.name.as_str()): entry } });
                }
                warn!(
                    criterion = %criterion.name,
                    "retry response had no entry for the criterion, using placeholder"
                );
                placeholder_fragment(&criterion.name)
            }
            Err(err) => {
                warn!(
                    criterion = %criterion.name,
                    error = %err,
                    "per-criterion retry failed, using placeholder"
                );
                placeholder_fragment(&criterion.name)
            }
        }
    }

    /// One provider call followed by JSON recovery. Returns the raw text
    /// alongside the parsed object for diagnostics.
    async fn attempt(
        &self,
        adapter: &dyn ProviderAdapter,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<(String, Value), AnalysisError> {
        let raw = adapter.execute(prompt, config).await?;
        let parsed = extract_json(&raw)?;
        Ok((raw, parsed))
    }
}

fn placeholder_fragment(name: &str) -> Value {
    json!({ "detailed_feedback": { (name): placeholder_entry() } })
}

/// Batch criteria with no feedback entry in the fragment. Matching is
/// case/whitespace-insensitive so cosmetic key drift does not trigger
/// needless retries.
fn missing_criteria<'a>(batch: &'a [Criterion], fragment: &Value) -> Vec<&'a Criterion> {
    let keys: Vec<String> = fragment
        .get("detailed_feedback")
        .and_then(Value::as_object)
        .map(|entries| entries.keys().map(|k| loose_key(k)).collect())
        .unwrap_or_default();

    batch
        .iter()
        .filter(|criterion| !keys.contains(&loose_key(&criterion.name)))
        .collect()
}

/// Pull the feedback entry for one criterion out of a retry fragment,
/// tolerating key drift in the same loose way.
fn criterion_entry(fragment: &Value, name: &str) -> Option<Value> {
    let entries = fragment.get("detailed_feedback")?.as_object()?;
    if let Some(entry) = entries.get(name) {
        return Some(entry.clone());
    }
    let wanted = loose_key(name);
    entries
        .iter()
        .find(|(key, _)| loose_key(key) == wanted)
        .map(|(_, entry)| entry.clone())
}
