use crate::models::{AggregateAnalysis, Criterion};
use serde_json::Value;
use tracing::warn;

/// Weighted overall score for a request, in [0, 100] rounded to 2 decimals.
///
/// Criteria are matched against feedback entries by exact name first, then
/// by normalized name (case-insensitive, punctuation collapsed). Criteria
/// with no matching entry, no usable score, or a non-positive weight are
/// skipped and reported back; the computation degrades to the unweighted
/// mean of all entry scores, and finally to 0, rather than failing.
pub fn calculate_weighted_score(
    criteria: &[Criterion],
    analysis: &AggregateAnalysis,
) -> (f64, Vec<String>) {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut skipped = Vec::new();

    for criterion in criteria {
        let entry = analysis
            .detailed_feedback
            .get(&criterion.name)
            .or_else(|| {
                let wanted = normalize_name(&criterion.name);
                analysis
                    .detailed_feedback
                    .iter()
                    .find(|(name, _)| normalize_name(name) == wanted)
                    .map(|(_, entry)| entry)
            });

        let score = entry.and_then(|e| e.get("score")).and_then(extract_score);

        match score {
            Some(score) if criterion.weight > 0.0 => {
                weighted_sum += score.clamp(0.0, 100.0) * criterion.weight;
                weight_total += criterion.weight;
            }
            _ => {
                warn!(
                    criterion = %criterion.name,
                    weight = criterion.weight,
                    matched = entry.is_some(),
                    "criterion excluded from weighted score"
                );
                skipped.push(criterion.name.clone());
            }
        }
    }

    if weight_total > 0.0 {
        return (round2(weighted_sum / weight_total), skipped);
    }

    // No criterion contributed. Fall back to the plain mean of whatever
    // numeric scores the analysis carries.
    let scores: Vec<f64> = analysis
        .detailed_feedback
        .values()
        .filter_map(|entry| entry.get("score").and_then(extract_score))
        .map(|s| s.clamp(0.0, 100.0))
        .collect();

    if scores.is_empty() {
        warn!("no usable scores anywhere in analysis, overall score is 0");
        (0.0, skipped)
    } else {
        warn!(
            count = scores.len(),
            "weighted score unavailable, using unweighted mean"
        );
        (round2(scores.iter().sum::<f64>() / scores.len() as f64), skipped)
    }
}

/// Scores arrive as numbers or as strings like "85" or "85%".
fn extract_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Lowercase, with runs of non-alphanumeric characters collapsed to one
/// space, so "Wait-Time" matches "wait time".
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
