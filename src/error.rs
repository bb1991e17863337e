//! Error types for the analytics core.
//!
//! Only configuration and shape problems are errors. Noisy labels, missing
//! scores and empty batches degrade to empty or zero results instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    /// A score row does not match the batch's question count.
    #[error("row for student '{student_id}' has {found} scores, expected {expected}")]
    RaggedRow {
        student_id: String,
        expected: usize,
        found: usize,
    },

    /// Two catalog entries share a canonical name.
    #[error("duplicate canonical knowledge point: {0}")]
    DuplicateCanonical(String),

    /// A name or alias resolves to more than one canonical entry.
    #[error("alias '{alias}' of '{conflicting}' collides with '{existing}'")]
    AliasCollision {
        alias: String,
        existing: String,
        conflicting: String,
    },

    #[error("malformed score table: {0}")]
    MalformedScoreTable(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
