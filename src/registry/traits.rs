//! Voter registry trait abstractions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A reviewer's voting credentials, as the registry currently sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterProfile {
    pub voter_id: String,
    /// Administratively assigned weight (1-10).
    pub voting_power: u64,
    pub is_authorized_voter: bool,
    pub can_create_proposals: bool,
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown voter: {0}")]
    UnknownVoter(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("invalid roster: {0}")]
    InvalidRoster(String),
}

/// Read-only voter registry.
///
/// `resolve` reflects the registry's current view; the council snapshots
/// voting power at vote time and total power at finalize time, so
/// mid-proposal administrative changes stay deterministic.
#[async_trait]
pub trait VoterRegistry: Send + Sync {
    /// Resolve a caller identity to its voting credentials.
    async fn resolve(&self, identity: &str) -> RegistryResult<VoterProfile>;

    /// Sum of voting power over all currently authorized voters.
    async fn total_eligible_voting_power(&self) -> RegistryResult<u64>;
}
