//! Error types for modelcycle
//!
//! Library code returns [`WorkflowError`]; the binary wraps it in `anyhow`
//! at the edge.

use thiserror::Error;

/// Failure to recover a run identifier from the tracking logs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunIdError {
    /// No `run-<token>.<ext>` file under the scanned directory
    #[error("No run identifier found under {dir}")]
    NotFound { dir: String },

    /// More than one distinct token found
    #[error("Ambiguous run identifier under {dir}: found {candidates:?}")]
    Ambiguous { dir: String, candidates: Vec<String> },

    /// The latest run still points at a run captured earlier
    #[error("Run identifier {id} is stale: latest run was not replaced by the last step")]
    Stale { id: String },

    /// Token is empty or contains non-alphanumeric characters
    #[error("Invalid run identifier: {0:?}")]
    Invalid(String),
}

/// Refusals raised before any destructive cleanup is attempted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CleanupError {
    #[error("Refusing remote cleanup of project {project}: no run identifiers given")]
    UnscopedDeletion { project: String },

    #[error("Alias selector requires at least one alias")]
    EmptyAliasList,
}

/// Main error type for the modelcycle workflow
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Run identifier extraction errors
    #[error(transparent)]
    RunId(#[from] RunIdError),

    /// Cleanup safety errors
    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    /// Loss assertion errors
    #[error("Loss check failed: {0}")]
    LossCheck(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Workflow error: {0}")]
    Generic(String),
}

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

impl From<anyhow::Error> for WorkflowError {
    fn from(err: anyhow::Error) -> Self {
        WorkflowError::Generic(err.to_string())
    }
}

impl WorkflowError {
    /// Whether this error must keep the workflow away from remote deletion
    pub fn blocks_remote_cleanup(&self) -> bool {
        matches!(self, WorkflowError::RunId(_) | WorkflowError::Cleanup(_))
    }
}
