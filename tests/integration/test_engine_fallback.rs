use lessonlens::analyzer::PLACEHOLDER_SCORE;
use lessonlens::prompts::PromptTemplate;
use lessonlens::{
    AnalysisEngine, AnalysisError, AnalysisRequest, Criterion, EngineOptions, GenerationConfig,
    InMemoryPromptStore, ProviderAdapter, ProviderName,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Adapter that replays a fixed sequence of responses and records every
/// prompt and config it was called with.
struct ScriptedAdapter {
    provider: ProviderName,
    responses: Mutex<VecDeque<Result<String, AnalysisError>>>,
    calls: Mutex<Vec<(String, GenerationConfig)>>,
}

impl ScriptedAdapter {
    fn new(provider: ProviderName, responses: Vec<Result<String, AnalysisError>>) -> Self {
        Self {
            provider,
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, GenerationConfig)> {
        self.calls.lock().unwrap().clone()
    }

    fn call_error(&self, message: &str) -> AnalysisError {
        AnalysisError::ProviderCall {
            provider: self.provider,
            criteria: Vec::new(),
            message: message.to_string(),
        }
    }
}

impl ProviderAdapter for ScriptedAdapter {
    fn execute<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> Pin<Box<dyn Future<Output = Result<String, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), config.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(self.call_error("script exhausted")))
        })
    }

    fn name(&self) -> ProviderName {
        self.provider
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }
}

fn store_with_prompt(provider: ProviderName) -> InMemoryPromptStore {
    let mut store = InMemoryPromptStore::new();
    store.insert(PromptTemplate {
        id: 1,
        provider,
        name: "analysis_prompt".to_string(),
        version: 1,
        text: "Analyze {{TRANSCRIPT_TEXT}} for {{TEACHER_NAME}}.\nCriteria:\n{{CRITERIA_LIST}}\nReturn JSON.".to_string(),
        active: true,
    });
    store
}

fn engine(adapter: Arc<ScriptedAdapter>, options: EngineOptions) -> AnalysisEngine {
    AnalysisEngine::new(Arc::new(store_with_prompt(adapter.provider)))
        .with_options(options)
        .register_adapter(adapter)
}

fn rubric3() -> Vec<Criterion> {
    vec![
        Criterion::new("Wait Time", 40.0),
        Criterion::new("Questioning", 40.0),
        Criterion::new("Closure", 20.0),
    ]
}

fn batch_fragment(entries: &[(&str, f64)]) -> String {
    let mut feedback = serde_json::Map::new();
    for (name, score) in entries {
        feedback.insert(
            name.to_string(),
            serde_json::json!({"score": score, "feedback": "Observed."}),
        );
    }
    serde_json::json!({
        "strengths": ["Good pacing"],
        "improvements": ["More wait time"],
        "detailed_feedback": feedback,
        "coaching_summary": "Solid lesson overall."
    })
    .to_string()
}

fn retry_fragment(name: &str, score: f64) -> String {
    serde_json::json!({
        "detailed_feedback": { (name): {"score": score, "feedback": "Retry feedback."} }
    })
    .to_string()
}

#[tokio::test]
async fn failed_batch_degrades_to_per_criterion_retries() {
    let adapter = Arc::new(ScriptedAdapter::new(
        ProviderName::Gemini,
        vec![
            Err(AnalysisError::ProviderCall {
                provider: ProviderName::Gemini,
                criteria: Vec::new(),
                message: "HTTP 503".to_string(),
            }),
            Ok(retry_fragment("Wait Time", 80.0)),
            Ok(retry_fragment("Questioning", 70.0)),
            Err(AnalysisError::ParseError("truncated".to_string())),
        ],
    ));
    let engine = engine(adapter.clone(), EngineOptions::default());
    let request = AnalysisRequest::new("transcript", rubric3(), ProviderName::Gemini);

    let result = engine.analyze(&request).await.unwrap();

    assert_eq!(result.analysis.score_of("Wait Time"), Some(80.0));
    assert_eq!(result.analysis.score_of("Questioning"), Some(70.0));
    assert_eq!(result.analysis.score_of("Closure"), Some(PLACEHOLDER_SCORE));
    assert!(result.skipped_criteria.is_empty());

    // 1 batch attempt + 3 per-criterion retries.
    let calls = adapter.calls();
    assert_eq!(calls.len(), 4);

    // Retries force structured output and raise the output ceiling.
    let (batch_prompt, batch_config) = &calls[0];
    let (retry_prompt, retry_config) = &calls[1];
    assert!(retry_config.json_output);
    assert!(retry_config.max_output_tokens > batch_config.max_output_tokens);
    assert!(retry_prompt.contains("STRICT OUTPUT FORMAT"));
    assert!(!batch_prompt.contains("STRICT OUTPUT FORMAT"));

    // Weighted: 80*40 + 70*40 + 55*20 over 100 weight.
    assert_eq!(result.overall_score, 71.0);
}

#[tokio::test]
async fn parse_failure_also_triggers_fallback() {
    let adapter = Arc::new(ScriptedAdapter::new(
        ProviderName::OpenAi,
        vec![
            Ok("The lesson went well! (not JSON)".to_string()),
            Ok(retry_fragment("Wait Time", 60.0)),
            Ok(retry_fragment("Questioning", 60.0)),
            Ok(retry_fragment("Closure", 60.0)),
        ],
    ));
    let engine = engine(adapter.clone(), EngineOptions::default());
    let request = AnalysisRequest::new("transcript", rubric3(), ProviderName::OpenAi);

    let result = engine.analyze(&request).await.unwrap();
    assert_eq!(result.overall_score, 60.0);
    assert_eq!(adapter.calls().len(), 4);
}

#[tokio::test]
async fn disable_fallback_propagates_the_batch_error() {
    let adapter = Arc::new(ScriptedAdapter::new(
        ProviderName::Gemini,
        vec![Err(AnalysisError::ProviderCall {
            provider: ProviderName::Gemini,
            criteria: Vec::new(),
            message: "HTTP 500".to_string(),
        })],
    ));
    let options = EngineOptions {
        disable_fallback: true,
        ..Default::default()
    };
    let engine = engine(adapter.clone(), options);
    let request = AnalysisRequest::new("transcript", rubric3(), ProviderName::Gemini);

    let err = engine.analyze(&request).await.unwrap_err();
    match err {
        AnalysisError::ProviderCall { criteria, .. } => {
            assert_eq!(criteria, vec!["Wait Time", "Questioning", "Closure"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn batch_omitting_a_criterion_retries_only_that_criterion() {
    let adapter = Arc::new(ScriptedAdapter::new(
        ProviderName::Gemini,
        vec![
            Ok(batch_fragment(&[("Wait Time", 85.0), ("Questioning", 75.0)])),
            Ok(retry_fragment("Closure", 65.0)),
        ],
    ));
    let engine = engine(adapter.clone(), EngineOptions::default());
    let request = AnalysisRequest::new("transcript", rubric3(), ProviderName::Gemini);

    let result = engine.analyze(&request).await.unwrap();
    assert_eq!(result.analysis.score_of("Closure"), Some(65.0));
    assert_eq!(adapter.calls().len(), 2);
    assert!(adapter.calls()[1].0.contains("Closure"));
}

#[tokio::test]
async fn wide_rubric_is_processed_in_sequential_batches() {
    let criteria: Vec<Criterion> = (0..7).map(|i| Criterion::new(format!("C{}", i), 10.0)).collect();
    let responses = vec![
        Ok(batch_fragment(&[("C0", 70.0), ("C1", 70.0), ("C2", 70.0)])),
        Ok(batch_fragment(&[("C3", 70.0), ("C4", 70.0), ("C5", 70.0)])),
        Ok(batch_fragment(&[("C6", 70.0)])),
    ];
    let adapter = Arc::new(ScriptedAdapter::new(ProviderName::Gemini, responses));
    let engine = engine(adapter.clone(), EngineOptions::default());
    let request = AnalysisRequest::new("transcript", criteria, ProviderName::Gemini);

    let result = engine.analyze(&request).await.unwrap();
    assert_eq!(result.analysis.detailed_feedback.len(), 7);
    assert_eq!(result.overall_score, 70.0);
    assert_eq!(adapter.calls().len(), 3);
}

#[tokio::test]
async fn drifted_feedback_keys_surface_under_requested_names() {
    let response = serde_json::json!({
        "strengths": [],
        "improvements": [],
        "detailed_feedback": {
            "wait  time": {"score": 80.0, "feedback": "Good pauses."}
        },
        "coaching_summary": "Keep it up."
    })
    .to_string();
    let adapter = Arc::new(ScriptedAdapter::new(ProviderName::Gemini, vec![Ok(response)]));
    let engine = engine(adapter.clone(), EngineOptions::default());
    let request = AnalysisRequest::new(
        "transcript",
        vec![Criterion::new("Wait Time", 100.0)],
        ProviderName::Gemini,
    );

    let result = engine.analyze(&request).await.unwrap();

    let keys: Vec<&String> = result.analysis.detailed_feedback.keys().collect();
    assert_eq!(keys, vec!["Wait Time"]);
    assert_eq!(result.analysis.score_of("Wait Time"), Some(80.0));
    // The drifted key satisfied the request, so no retry was issued.
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn unrequested_feedback_entries_are_discarded() {
    let response = serde_json::json!({
        "strengths": [],
        "improvements": [],
        "detailed_feedback": {
            "Wait Time": {"score": 72.0, "feedback": "Decent pauses."},
            "Overall Vibes": {"score": 99.0, "feedback": "Great energy."},
            "notes": "free text, not even an object"
        },
        "coaching_summary": "Nice work."
    })
    .to_string();
    let adapter = Arc::new(ScriptedAdapter::new(ProviderName::OpenAi, vec![Ok(response)]));
    let engine = engine(adapter.clone(), EngineOptions::default());
    let request = AnalysisRequest::new(
        "transcript",
        vec![Criterion::new("Wait Time", 100.0)],
        ProviderName::OpenAi,
    );

    let result = engine.analyze(&request).await.unwrap();

    assert_eq!(result.analysis.detailed_feedback.len(), 1);
    assert!(result.analysis.detailed_feedback.contains_key("Wait Time"));
    assert_eq!(result.overall_score, 72.0);
}

#[tokio::test]
async fn terminal_errors_do_not_enter_the_fallback_path() {
    let adapter = Arc::new(ScriptedAdapter::new(ProviderName::Gemini, vec![]));
    let engine = AnalysisEngine::new(Arc::new(InMemoryPromptStore::new()))
        .register_adapter(adapter.clone());
    let request = AnalysisRequest::new("transcript", rubric3(), ProviderName::Gemini);

    match engine.analyze(&request).await.unwrap_err() {
        AnalysisError::NoPromptConfigured { provider } => {
            assert_eq!(provider, ProviderName::Gemini)
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(adapter.calls().is_empty());
}
