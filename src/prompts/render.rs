use crate::models::{AnalysisContext, Criterion, EvidenceBlocks};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Any placeholder left after substitution is deleted so template syntax
    // never leaks into the rendered prompt.
    static ref LEFTOVER_PLACEHOLDER: Regex = Regex::new(r"\{\{[^}]+\}\}").unwrap();
}

/// How much structure the model is asked to produce per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Tight budgets; two-field feedback entries only.
    #[default]
    Minimal,
    /// Larger budgets with optional coaching extras.
    Rich,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// All criteria in one call; compresses feedback budgets further.
    pub single_shot: bool,
    /// Per-criterion retry rendering: reduced schema, score + feedback only.
    pub minimal_per_criterion: bool,
    pub mode: OutputMode,
}

impl RenderOptions {
    pub fn batch(single_shot: bool, mode: OutputMode) -> Self {
        Self {
            single_shot,
            minimal_per_criterion: false,
            mode,
        }
    }

    pub fn per_criterion_retry() -> Self {
        Self {
            single_shot: false,
            minimal_per_criterion: true,
            mode: OutputMode::Minimal,
        }
    }
}

/// Substitute the fixed placeholder set into a prompt template and append
/// the output constraints for the selected mode.
pub fn render_prompt(
    template: &str,
    transcript: &str,
    criteria: &[Criterion],
    context: &AnalysisContext,
    evidence: &EvidenceBlocks,
    options: &RenderOptions,
) -> String {
    let criteria_list = criteria
        .iter()
        .map(Criterion::render_line)
        .collect::<Vec<_>>()
        .join("\n");

    let substituted = template
        .replace("{{TRANSCRIPT_TEXT}}", transcript)
        .replace("{{TEACHER_NAME}}", context.teacher_name())
        .replace("{{CLASS_NAME}}", context.class_name())
        .replace("{{SUBJECT}}", context.subject())
        .replace("{{GRADE}}", context.grade())
        .replace("{{TEMPLATE_NAME}}", context.template_name())
        .replace("{{CRITERIA_LIST}}", &criteria_list)
        .replace("{{WAIT_TIME_METRICS}}", evidence.wait_time_metrics())
        .replace("{{TIMING_SECTION}}", evidence.timing_section());

    let mut prompt = LEFTOVER_PLACEHOLDER
        .replace_all(&substituted, "")
        .into_owned();

    // Templates that never mention JSON get an explicit format reminder to
    // keep responses machine-parsable.
    if !prompt.contains("JSON") && !prompt.contains("json") {
        prompt.push_str(
            "\n\nIMPORTANT: Return ONLY one valid JSON object. No code fences, no backticks, no explanations.",
        );
    }

    if options.minimal_per_criterion {
        append_per_criterion_constraints(&mut prompt, criteria);
        return prompt;
    }

    match options.mode {
        OutputMode::Rich => prompt.push_str(
            "\n\nOUTPUT CONSTRAINTS (rich, tight budgets):\n\
             - Total JSON \u{2264} 8000 characters.\n\
             - strengths: max 3 bullet strings; improvements: max 3 bullet strings.\n\
             - detailed_feedback: for each criterion: {\"score\": number, \"feedback\": string}.\n\
             - feedback: \u{2264}3 sentences (\u{2264}60 words).\n\
             - coaching_summary: \u{2264}120 words.\n\
             - Optional (concise): next_lesson_plan (3 short steps), prioritized_criteria (\u{2264}2).",
        ),
        OutputMode::Minimal => prompt.push_str(
            "\n\nOUTPUT CONSTRAINTS (to fit response budget):\n\
             - Total JSON \u{2264} 4000 characters.\n\
             - strengths: max 2 bullet strings; improvements: max 2 bullet strings.\n\
             - detailed_feedback: include ONLY the criteria listed above (no others), with EXACT names; \
             include ONLY two fields per criterion: {\"score\": number, \"feedback\": string}.\n\
             - feedback: 1 short sentence (\u{2264}25 words) per criterion.\n\
             - coaching_summary: \u{2264}60 words.",
        ),
    }

    // Single-shot calls (or very wide rubrics) squeeze the budgets further
    // to keep one response inside the output ceiling.
    if options.single_shot || criteria.len() > 12 {
        prompt.push_str(
            "\n- single-shot mode: for each criterion, feedback must be exactly 1 sentence (\u{2264}20 words).\n\
             - Do NOT include any fields other than score and feedback.\n\
             - strengths/improvements arrays: \u{2264}2 items each.\n\
             - coaching_summary: \u{2264}40 words.",
        );
    }

    prompt
}

fn append_per_criterion_constraints(prompt: &mut String, criteria: &[Criterion]) {
    let names = criteria
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    prompt.push_str(&format!(
        "\n\nSTRICT OUTPUT FORMAT (minimal per-criterion):\n\
         Return ONLY this JSON shape (no extra keys):\n\
         {{\n  \"detailed_feedback\": {{\n    \"<criterion_name>\": {{ \"score\": number, \"feedback\": string }}\n  }}\n}}\n\
         - Only include entries for: {}.\n\
         - Omit strengths, improvements, coaching_summary, and any other keys.\n\
         - feedback must be 1 short sentence (\u{2264}15 words).",
        names
    ));
}
