//! CouncilService: the exposed operation surface.
//!
//! Resolves caller identities through the voter registry (explicitly, per
//! call - there is no ambient session), verifies the emergency credential,
//! and drives the store. Registry calls carry a bounded timeout and are
//! never made while the store's write gate is held.

use crate::council::credential::{EmergencyCredential, SuppliedSecret};
use crate::council::error::{CouncilError, CouncilResult};
use crate::council::proposal::{
    Proposal, ProposalDraft, ProposalKind, UrgencyClass, Vote, VoteChoice,
};
use crate::council::store::ProposalStore;
use crate::registry::traits::{RegistryError, VoterProfile, VoterRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Exposed council operations.
pub struct CouncilService<R: VoterRegistry> {
    store: Arc<ProposalStore>,
    registry: Arc<R>,
    credential: EmergencyCredential,
}

impl<R: VoterRegistry> CouncilService<R> {
    pub fn new(store: Arc<ProposalStore>, registry: Arc<R>, credential: EmergencyCredential) -> Self {
        Self {
            store,
            registry,
            credential,
        }
    }

    /// Create a proposal. The creator must hold the proposal-creation
    /// permission, and at least one authorized voter must exist.
    pub async fn create_proposal(
        &self,
        creator_id: &str,
        kind: ProposalKind,
        urgency_class: UrgencyClass,
        reasoning: String,
        evidence_ref: Option<String>,
    ) -> CouncilResult<Proposal> {
        let profile = self.resolve(creator_id).await?;
        if !profile.can_create_proposals {
            return Err(CouncilError::Authorization(format!(
                "{} is not permitted to create proposals",
                profile.voter_id
            )));
        }

        let total_power = self.total_power().await?;
        if total_power == 0 {
            return Err(CouncilError::Validation(
                "no authorized voters exist; refusing to open a vote nobody can decide".to_string(),
            ));
        }

        self.store
            .create(ProposalDraft {
                kind,
                urgency_class,
                creator_id: profile.voter_id,
                reasoning,
                evidence_ref,
            })
            .await
    }

    /// Cast a vote with the caller's current registry weight.
    pub async fn cast_vote(
        &self,
        proposal_id: i64,
        voter_id: &str,
        choice: VoteChoice,
        reasoning: &str,
    ) -> CouncilResult<Vote> {
        let profile = self.resolve(voter_id).await?;
        if !profile.is_authorized_voter {
            return Err(CouncilError::Authorization(format!(
                "{} is not an authorized voter",
                profile.voter_id
            )));
        }

        let total_power = self.total_power().await?;
        self.store
            .cast_vote(
                proposal_id,
                &profile.voter_id,
                profile.voting_power,
                total_power,
                choice,
                reasoning,
            )
            .await
    }

    /// Emergency fast-path finalization, gated by the shared credential.
    pub async fn emergency_finalize(
        &self,
        proposal_id: i64,
        secret: &SuppliedSecret,
    ) -> CouncilResult<Proposal> {
        if !self.credential.verify(secret) {
            return Err(CouncilError::Authorization(
                "emergency credential rejected".to_string(),
            ));
        }

        let total_power = self.total_power().await?;
        self.store.emergency_finalize(proposal_id, total_power).await
    }

    pub async fn get_proposal(&self, proposal_id: i64) -> CouncilResult<Proposal> {
        self.store.get(proposal_id).await
    }

    pub async fn list_votes(&self, proposal_id: i64) -> CouncilResult<Vec<Vote>> {
        self.store.list_votes(proposal_id).await
    }

    async fn resolve(&self, identity: &str) -> CouncilResult<VoterProfile> {
        match timeout(REGISTRY_TIMEOUT, self.registry.resolve(identity)).await {
            Err(_) => Err(CouncilError::Unavailable(
                "voter registry timed out".to_string(),
            )),
            Ok(Err(RegistryError::UnknownVoter(id))) => Err(CouncilError::Authorization(format!(
                "unknown voter: {}",
                id
            ))),
            Ok(Err(e)) => Err(CouncilError::Unavailable(e.to_string())),
            Ok(Ok(profile)) => Ok(profile),
        }
    }

    async fn total_power(&self) -> CouncilResult<u64> {
        match timeout(REGISTRY_TIMEOUT, self.registry.total_eligible_voting_power()).await {
            Err(_) => Err(CouncilError::Unavailable(
                "voter registry timed out".to_string(),
            )),
            Ok(Err(e)) => Err(CouncilError::Unavailable(e.to_string())),
            Ok(Ok(total)) => Ok(total),
        }
    }
}
