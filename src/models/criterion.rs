use serde::{Deserialize, Serialize};

/// A single weighted rubric dimension the transcript is scored against.
/// Names must be unique within one request; weights are percentages in
/// practice (0-100) but any positive number is accepted by the score
/// calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub weight: f64,
    pub description: Option<String>,
}

impl Criterion {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Rubric line as it appears in the rendered criteria list.
    pub fn render_line(&self) -> String {
        format!(
            "- {} ({}%): {}",
            self.name,
            self.weight,
            self.description.as_deref().unwrap_or("No description provided")
        )
    }
}
