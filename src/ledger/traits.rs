//! Allocation ledger trait abstractions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Type-specific allocation-table mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    /// Update a patient's urgency value.
    UpdateUrgency {
        patient_ref: String,
        from: i64,
        to: i64,
    },
    /// Deactivate a patient on the queue.
    DeactivatePatient { patient_ref: String },
    /// Update a named allocation parameter.
    SetParameter {
        parameter: String,
        from: i64,
        to: i64,
    },
    /// Application-specific override of the allocation engine.
    Override { subject_ref: Option<String> },
}

/// A mutation request for one approved proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub proposal_id: i64,
    #[serde(flatten)]
    pub op: MutationOp,
    /// Deterministic per-proposal key; the ledger deduplicates on it.
    pub idempotency_key: String,
}

/// Opaque reference to an applied mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRef(pub String);

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("mutation rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl LedgerError {
    /// Transient failures worth retrying; a rejected mutation is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_) | LedgerError::Io(_))
    }
}

/// External allocation-table mutation service.
///
/// `apply` must be idempotent by `idempotency_key`: replaying a request
/// returns the original execution reference without a second mutation.
#[async_trait]
pub trait AllocationLedger: Send + Sync {
    async fn apply(&self, request: &MutationRequest) -> LedgerResult<ExecutionRef>;
}
