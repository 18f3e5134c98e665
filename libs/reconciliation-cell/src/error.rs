use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Reconciliation run timed out after {timeout_seconds} seconds")]
    RunTimeout { timeout_seconds: u64 },

    #[error("A reconciliation run is already in progress")]
    RunInProgress,
}
