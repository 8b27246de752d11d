use lessonlens::prompts::{resolve_prompt, InMemoryPromptStore};
use lessonlens::{AnalysisError, ProviderName};

#[test]
fn no_prompt_error_names_the_provider() {
    let store = InMemoryPromptStore::new();
    let err = resolve_prompt(&store, ProviderName::Vertex, None, "analysis_prompt").unwrap_err();
    match &err {
        AnalysisError::NoPromptConfigured { provider } => {
            assert_eq!(*provider, ProviderName::Vertex)
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("vertex"));
}

#[test]
fn provider_call_message_scopes_the_failure() {
    let err = AnalysisError::ProviderCall {
        provider: ProviderName::OpenRouter,
        criteria: vec!["Wait Time".to_string(), "Pacing".to_string()],
        message: "HTTP 429: rate limited".to_string(),
    };
    let text = err.to_string();
    assert!(text.contains("openrouter"));
    assert!(text.contains("Wait Time, Pacing"));
    assert!(text.contains("429"));
}

#[test]
fn transient_errors_are_exactly_call_and_parse_failures() {
    let transient = [
        AnalysisError::ProviderCall {
            provider: ProviderName::Gemini,
            criteria: vec![],
            message: "timeout".to_string(),
        },
        AnalysisError::ParseError("{garbled".to_string()),
    ];
    for err in transient {
        assert!(err.is_transient(), "{:?} should be transient", err);
    }

    let terminal = [
        AnalysisError::NoPromptConfigured {
            provider: ProviderName::OpenAi,
        },
        AnalysisError::ProviderNotRegistered(ProviderName::Vertex),
        AnalysisError::ValidationError("coaching_summary is missing".to_string()),
        AnalysisError::ConfigError("bad key".to_string()),
    ];
    for err in terminal {
        assert!(!err.is_transient(), "{:?} should be terminal", err);
    }
}

#[test]
fn serde_errors_convert_automatically() {
    fn parse(raw: &str) -> Result<serde_json::Value, AnalysisError> {
        Ok(serde_json::from_str(raw)?)
    }
    match parse("not json").unwrap_err() {
        AnalysisError::SerializationError(_) => {}
        other => panic!("unexpected error: {:?}", other),
    }
}
