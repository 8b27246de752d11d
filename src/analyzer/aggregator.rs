use crate::models::{AggregateAnalysis, AnalysisContext, Criterion};
use serde_json::{json, Value};
use tracing::debug;

/// Motivational baseline assigned when a criterion could not be scored by
/// the provider even after the per-criterion retry.
pub const PLACEHOLDER_SCORE: f64 = 55.0;

const MAX_BULLETS: usize = 3;

/// Merge per-batch JSON fragments into one analysis, in batch order.
///
/// `detailed_feedback` keys are canonicalized to the requested criterion
/// names: an entry whose key loosely matches a criterion is stored under
/// that criterion's exact name, and entries matching no requested criterion
/// are dropped. Duplicates overwrite, so a later batch (or a retry fragment)
/// replaces an earlier entry for the same criterion. Strengths and
/// improvements are concatenated with near-duplicates removed. The first
/// non-empty coaching summary wins.
pub fn merge_fragments(criteria: &[Criterion], fragments: &[Value]) -> AggregateAnalysis {
    let canonical: Vec<(String, &str)> = criteria
        .iter()
        .map(|c| (loose_key(&c.name), c.name.as_str()))
        .collect();

    let mut analysis = AggregateAnalysis::default();

    for fragment in fragments {
        if let Some(entries) = fragment.get("detailed_feedback").and_then(Value::as_object) {
            for (name, entry) in entries {
                let key = loose_key(name);
                match canonical.iter().find(|(k, _)| *k == key) {
                    Some((_, requested)) => {
                        analysis
                            .detailed_feedback
                            .insert((*requested).to_string(), entry.clone());
                    }
                    None => {
                        debug!(key = %name, "dropping feedback entry for unrequested criterion");
                    }
                }
            }
        }

        append_bullets(&mut analysis.strengths, fragment.get("strengths"));
        append_bullets(&mut analysis.improvements, fragment.get("improvements"));

        if analysis.coaching_summary.is_empty() {
            if let Some(summary) = fragment.get("coaching_summary").and_then(Value::as_str) {
                let summary = summary.trim();
                if !summary.is_empty() {
                    analysis.coaching_summary = summary.to_string();
                }
            }
        }
    }

    analysis.strengths.truncate(MAX_BULLETS);
    analysis.improvements.truncate(MAX_BULLETS);
    analysis
}

fn append_bullets(target: &mut Vec<String>, source: Option<&Value>) {
    let Some(items) = source.and_then(Value::as_array) else {
        return;
    };
    for item in items {
        let Some(text) = item.as_str() else { continue };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let key = loose_key(text);
        if !target.iter().any(|existing| loose_key(existing) == key) {
            target.push(text.to_string());
        }
    }
}

/// Case/whitespace-insensitive comparison key, used both for bullet dedupe
/// and for matching feedback keys back to requested criterion names.
pub(crate) fn loose_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Placeholder feedback entry for a criterion with no usable provider output.
pub fn placeholder_entry() -> Value {
    json!({
        "score": PLACEHOLDER_SCORE,
        "feedback": "AI response unavailable due to provider output constraints. \
                     Assigning motivational baseline. \
                     Focus on 1 small, visible move next lesson."
    })
}

/// Deterministic coaching summary from per-criterion scores, used when no
/// batch produced one. Names the two strongest and two weakest criteria.
pub fn synthesize_coaching_summary(
    analysis: &AggregateAnalysis,
    context: &AnalysisContext,
) -> String {
    let mut scored: Vec<(&str, f64)> = analysis
        .detailed_feedback
        .iter()
        .filter_map(|(name, entry)| {
            entry
                .get("score")
                .and_then(Value::as_f64)
                .map(|score| (name.as_str(), score))
        })
        .collect();

    if scored.is_empty() {
        return format!(
            "Analysis completed for {} in {}. Review the detailed feedback for next steps.",
            context.subject(),
            context.grade()
        );
    }

    // Stable tiebreak on name keeps the synthesized text deterministic.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let label = |(name, score): &(&str, f64)| format!("{} ({})", name, score);
    let top: Vec<String> = scored.iter().take(2).map(label).collect();
    let bottom: Vec<String> = scored.iter().rev().take(2).map(label).collect();

    format!(
        "Celebrating strengths in {}. Prioritize growth in {}. \
         Keep coaching moves tangible and student-facing to lift engagement \
         and clarity in {} for {}.",
        top.join(" and "),
        bottom.join(" and "),
        context.subject(),
        context.grade()
    )
}
