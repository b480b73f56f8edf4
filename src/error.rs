//! Error types for the evaluation library.
//!
//! Schema, length and empty-input errors are fatal and reach the caller.
//! Embedding errors, timeouts included, are recovered inside the metrics
//! engine.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Required fields or columns are missing from the input.
    #[error("{context}: missing required fields: {}", missing.join(", "))]
    Schema {
        context: String,
        missing: Vec<String>,
    },

    /// Batch evaluation got a different number of queries and results.
    #[error("number of queries ({queries}) must match number of results ({results})")]
    LengthMismatch { queries: usize, results: usize },

    /// The embedding call failed.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The embedding call missed its deadline, or an earlier call that did is
    /// still holding the backend.
    #[error("embedding timed out: {0}")]
    EmbeddingTimeout(String),

    /// Nothing to aggregate.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A field is present but cannot be read as the expected type.
    #[error("{context}: invalid value '{value}'")]
    InvalidValue { context: String, value: String },

    /// A report version directory is never written twice.
    #[error("report version directory {} already exists", .0.display())]
    VersionExists(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("plot rendering failed: {0}")]
    Plot(String),
}

impl EvalError {
    pub fn schema(context: impl Into<String>, missing: Vec<String>) -> Self {
        Self::Schema {
            context: context.into(),
            missing,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
