//! Mock voter registry for tests.

use crate::registry::traits::{RegistryError, RegistryResult, VoterProfile, VoterRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory registry with failure injection.
#[derive(Clone, Default)]
pub struct MockRegistry {
    voters: Arc<RwLock<HashMap<String, VoterProfile>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with authorized voters of the given weights,
    /// all allowed to create proposals.
    pub async fn with_voters(voters: &[(&str, u64)]) -> Self {
        let registry = Self::new();
        for (id, power) in voters {
            registry
                .add_voter(VoterProfile {
                    voter_id: id.to_string(),
                    voting_power: *power,
                    is_authorized_voter: true,
                    can_create_proposals: true,
                })
                .await;
        }
        registry
    }

    pub async fn add_voter(&self, profile: VoterProfile) {
        self.voters
            .write()
            .await
            .insert(profile.voter_id.clone(), profile);
    }

    pub async fn remove_voter(&self, voter_id: &str) {
        self.voters.write().await.remove(voter_id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> RegistryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(RegistryError::Unavailable("injected outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VoterRegistry for MockRegistry {
    async fn resolve(&self, identity: &str) -> RegistryResult<VoterProfile> {
        self.check_available()?;
        self.voters
            .read()
            .await
            .get(identity)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownVoter(identity.to_string()))
    }

    async fn total_eligible_voting_power(&self) -> RegistryResult<u64> {
        self.check_available()?;
        Ok(self
            .voters
            .read()
            .await
            .values()
            .filter(|v| v.is_authorized_voter)
            .map(|v| v.voting_power)
            .sum())
    }
}
