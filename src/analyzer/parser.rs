use crate::error::AnalysisError;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    // Interior of a fenced code block, with or without a language tag.
    static ref FENCED_BLOCK: Regex = Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap();
}

const SNIPPET_LIMIT: usize = 500;

/// Recover a JSON object from raw model output.
///
/// Models wrap JSON in code fences, prepend prose, or trail commentary even
/// when told not to. Strategies are tried in order of strictness:
/// direct parse, fenced block interior, outermost brace slice, and finally
/// stripping stray fence markers. The parsed value must be an object.
pub fn extract_json(raw: &str) -> Result<Value, AnalysisError> {
    let trimmed = raw.trim();

    if let Some(value) = parse_object(trimmed) {
        return Ok(value);
    }

    if let Some(captures) = FENCED_BLOCK.captures(trimmed) {
        if let Some(value) = captures.get(1).and_then(|m| parse_object(m.as_str())) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Some(value) = parse_object(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    let stripped = trimmed
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if let Some(value) = parse_object(stripped) {
        return Ok(value);
    }

    Err(AnalysisError::ParseError(snippet(trimmed)))
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Prefix of the raw output for error messages, bounded in characters.
fn snippet(raw: &str) -> String {
    let mut chars = raw.chars();
    let prefix: String = chars.by_ref().take(SNIPPET_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}...", prefix)
    } else {
        prefix
    }
}
