use crate::error::AnalysisError;
use crate::models::AggregateAnalysis;
use serde_json::Value;

/// Structural checks on the merged analysis before scoring. The first
/// violation found is returned, naming the offending field.
pub fn validate_analysis(analysis: &AggregateAnalysis) -> Result<(), AnalysisError> {
    if analysis.coaching_summary.trim().is_empty() {
        return Err(AnalysisError::ValidationError(
            "coaching_summary is missing or empty".to_string(),
        ));
    }

    if analysis.detailed_feedback.is_empty() {
        return Err(AnalysisError::ValidationError(
            "detailed_feedback contains no criteria".to_string(),
        ));
    }

    for (name, entry) in &analysis.detailed_feedback {
        let Some(object) = entry.as_object() else {
            return Err(AnalysisError::ValidationError(format!(
                "detailed_feedback entry '{}' is not an object",
                name
            )));
        };

        match object.get("score").and_then(Value::as_f64) {
            Some(score) if score.is_finite() => {}
            _ => {
                return Err(AnalysisError::ValidationError(format!(
                    "detailed_feedback entry '{}' has a missing or non-numeric score",
                    name
                )))
            }
        }

        match object.get("feedback").and_then(Value::as_str) {
            Some(feedback) if !feedback.trim().is_empty() => {}
            _ => {
                return Err(AnalysisError::ValidationError(format!(
                    "detailed_feedback entry '{}' has missing or empty feedback",
                    name
                )))
            }
        }
    }

    Ok(())
}
