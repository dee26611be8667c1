//! Error types for the invoice intake orchestrator

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for intake and query operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {

    // =============================
    // Intake Pipeline Errors
    // =============================

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Commit error: {0}")]
    Commit(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    // =============================
    // Query Path Errors
    // =============================

    #[error("Unsafe query rejected: {0}")]
    UnsafeQuery(String),

    #[error("Query execution error: {0}")]
    Execution(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable kind label, used to classify task failures for polling callers.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Extraction(_) => "extraction",
            PipelineError::Capability(_) => "capability",
            PipelineError::Commit(_) => "commit",
            PipelineError::Database(_) => "database",
            PipelineError::TaskNotFound(_) => "task_not_found",
            PipelineError::UnsafeQuery(_) => "unsafe_query",
            PipelineError::Execution(_) => "execution",
            PipelineError::Serialization(_) => "serialization",
            PipelineError::Http(_) => "http",
            PipelineError::Io(_) => "io",
        }
    }
}
