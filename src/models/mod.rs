pub mod analysis;
pub mod criterion;
pub mod request;

pub use analysis::{AggregateAnalysis, BatchResult, ScoredResult};
pub use criterion::Criterion;
pub use request::{AnalysisContext, AnalysisRequest, EvidenceBlocks, ProviderName};
