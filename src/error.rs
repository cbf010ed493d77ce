/// Error type for every operation run through the execution template.
///
/// Callers see this single type regardless of where the failure happened;
/// the driver error is always kept as the `source` so the full cause chain
/// is available for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Connection acquisition failed: {0}")]
    Acquire(#[source] sqlx::Error),

    #[error("Connection configuration failed ({step}): {source}")]
    Configure {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Statement failed: {0}")]
    Statement(#[from] sqlx::Error),

    #[error("Transaction commit failed: {0}")]
    Commit(#[source] sqlx::Error),

    /// The rollback issued after `cause` failed as well. The session state
    /// is unknown at this point.
    #[error("Transaction rollback failed: {source} (after: {cause})")]
    Rollback {
        #[source]
        source: sqlx::Error,
        cause: Box<ExecutionError>,
    },

    /// Releasing the connection failed. `pending` holds the failure that was
    /// already being surfaced, if any.
    #[error("Connection release failed: {source}")]
    Release {
        #[source]
        source: sqlx::Error,
        pending: Option<Box<ExecutionError>>,
    },
}

impl ExecutionError {
    /// The failure that started it all, skipping the rollback and release
    /// wrappers.
    pub fn root(&self) -> &ExecutionError {
        match self {
            ExecutionError::Rollback { cause, .. } => cause.root(),
            ExecutionError::Release {
                pending: Some(pending),
                ..
            } => pending.root(),
            other => other,
        }
    }
}

/// Result type for operations run through the execution template
pub type ExecutionResult<T> = Result<T, ExecutionError>;
