use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Outcome of one batch attempt. Transient, scoped to a single request;
/// a failure marker routes the batch into the per-criterion fallback.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub criteria_names: Vec<String>,
    pub raw_text: Option<String>,
    pub parsed: Option<Value>,
}

impl BatchResult {
    pub fn succeeded(criteria_names: Vec<String>, raw_text: String, parsed: Value) -> Self {
        Self {
            criteria_names,
            raw_text: Some(raw_text),
            parsed: Some(parsed),
        }
    }

    pub fn failed(criteria_names: Vec<String>) -> Self {
        Self {
            criteria_names,
            raw_text: None,
            parsed: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.parsed.is_none()
    }
}

/// The merged analysis spanning all batches of one request.
///
/// Entries in `detailed_feedback` stay as raw JSON objects: providers may
/// attach optional evidence fields beyond score/feedback, and the validator
/// checks shape without coercing or dropping anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateAnalysis {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub detailed_feedback: HashMap<String, Value>,
    pub coaching_summary: String,
}

impl AggregateAnalysis {
    /// Numeric score for a criterion entry, if the entry carries one.
    pub fn score_of(&self, criterion_name: &str) -> Option<f64> {
        self.detailed_feedback
            .get(criterion_name)
            .and_then(|entry| entry.get("score"))
            .and_then(Value::as_f64)
    }

    /// Feedback text for a criterion entry, if present.
    pub fn feedback_of(&self, criterion_name: &str) -> Option<&str> {
        self.detailed_feedback
            .get(criterion_name)
            .and_then(|entry| entry.get("feedback"))
            .and_then(Value::as_str)
    }
}

/// Final result: the aggregate plus the weighted overall score in [0,100]
/// (rounded to 2 decimals). `skipped_criteria` names criteria that did not
/// contribute to the weighted computation (unmatched name, non-numeric score,
/// or non-positive weight) so the omission is visible to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub analysis: AggregateAnalysis,
    pub overall_score: f64,
    pub skipped_criteria: Vec<String>,
}
