pub mod aggregator;
pub mod batcher;
pub mod orchestrator;
pub mod parser;
pub mod scoring;
pub mod validator;

pub use aggregator::{merge_fragments, placeholder_entry, synthesize_coaching_summary, PLACEHOLDER_SCORE};
pub use batcher::{chunk_criteria, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, MIN_BATCH_SIZE};
pub use orchestrator::{AnalysisEngine, EngineOptions, DEFAULT_PROMPT_NAME};
pub use parser::extract_json;
pub use scoring::calculate_weighted_score;
pub use validator::validate_analysis;
