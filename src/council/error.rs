//! Council error taxonomy.
//!
//! Every mutating operation returns a typed error. Validation and
//! authorization failures are final from the caller's perspective;
//! `Unavailable` is the only transient variant and the only one the
//! scheduler/dispatcher retry.

/// Result type for council operations
pub type CouncilResult<T> = Result<T, CouncilError>;

/// Council operation errors
#[derive(Debug, thiserror::Error)]
pub enum CouncilError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("proposal {0} is not accepting votes")]
    NotActive(i64),

    #[error("invalid state for proposal {id}: {reason}")]
    InvalidState { id: i64, reason: String },

    #[error("voter {voter_id} already voted on proposal {proposal_id}")]
    DuplicateVote { proposal_id: i64, voter_id: String },

    #[error("proposal {0} has not reached the emergency supermajority")]
    NotEligible(i64),

    #[error("proposal {0} was already executed")]
    AlreadyExecuted(i64),

    #[error("proposal {0} not found")]
    NotFound(i64),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for CouncilError {
    fn from(e: sqlx::Error) -> Self {
        CouncilError::Store(e.to_string())
    }
}

impl CouncilError {
    /// Transient failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, CouncilError::Unavailable(_))
    }
}
