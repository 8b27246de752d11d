// Prompt resolution and rendering - template store seam plus placeholder
// substitution with per-mode output constraints.

pub mod render;
pub mod store;

pub use render::{render_prompt, OutputMode, RenderOptions};
pub use store::{
    resolve_prompt, validate_template, InMemoryPromptStore, PromptStore, PromptTemplate,
};
