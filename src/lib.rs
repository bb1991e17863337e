//! Exam analytics: knowledge-point mastery, class summary and focus students
//! from per-question score tables.

pub mod config;
pub mod error;
pub mod import;
pub mod knowledge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod summary;
pub mod taxonomy;

pub use config::AnalysisConfig;
pub use error::InsightError;
pub use models::{AnalysisReport, KnowledgeMapInput, ScoreRow, ScoreTable};
pub use pipeline::analyze;
pub use taxonomy::TaxonomyIndex;
