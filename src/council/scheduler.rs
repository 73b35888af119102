//! Lifecycle scheduler: deadline finalization sweep.
//!
//! Scans for Active proposals past their voting deadline and finalizes
//! each through the store. Total eligible power is sampled from the
//! registry once per sweep, at finalize time. One proposal's failure never
//! blocks the rest of the batch, and overlapping sweeps are harmless
//! because finalization is idempotent.

use crate::council::error::{CouncilError, CouncilResult};
use crate::council::now_secs;
use crate::council::store::ProposalStore;
use crate::registry::traits::VoterRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

const REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Periodic deadline finalization task.
pub struct LifecycleScheduler<R: VoterRegistry> {
    store: Arc<ProposalStore>,
    registry: Arc<R>,
    tick_interval: Duration,
}

impl<R: VoterRegistry> LifecycleScheduler<R> {
    pub fn new(store: Arc<ProposalStore>, registry: Arc<R>, tick_interval: Duration) -> Self {
        Self {
            store,
            registry,
            tick_interval,
        }
    }

    /// Run the sweep loop until the task is dropped.
    pub async fn run(&self) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(finalized) if finalized > 0 => {
                    tracing::info!(finalized, "deadline sweep complete");
                }
                Ok(_) => {}
                Err(e) => {
                    // systemic failure (registry or scan); proposals stay
                    // pending until the next sweep
                    tracing::warn!(error = %e, "deadline sweep failed");
                }
            }
        }
    }

    /// One sweep over due proposals. Returns how many were finalized.
    pub async fn tick(&self) -> CouncilResult<usize> {
        self.tick_at(now_secs()).await
    }

    pub async fn tick_at(&self, now: i64) -> CouncilResult<usize> {
        let total_power = match timeout(
            REGISTRY_TIMEOUT,
            self.registry.total_eligible_voting_power(),
        )
        .await
        {
            Err(_) => {
                return Err(CouncilError::Unavailable(
                    "voter registry timed out".to_string(),
                ))
            }
            Ok(Err(e)) => return Err(CouncilError::Unavailable(e.to_string())),
            Ok(Ok(total)) => total,
        };

        let due = self.store.due_proposals(now).await?;
        let mut finalized = 0;
        for proposal_id in due {
            match self
                .store
                .finalize_at_deadline_at(proposal_id, total_power, now)
                .await
            {
                Ok(proposal) => {
                    tracing::info!(
                        proposal = proposal_id,
                        status = proposal.status.as_str(),
                        "proposal finalized"
                    );
                    finalized += 1;
                }
                Err(e) => {
                    tracing::warn!(proposal = proposal_id, error = %e, "finalize failed");
                }
            }
        }
        Ok(finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::policy::VotingPolicy;
    use crate::council::proposal::{ProposalDraft, ProposalKind, ProposalStatus, UrgencyClass, VoteChoice};
    use crate::registry::mock::MockRegistry;

    const NOW: i64 = 1_700_000_000;
    const PROPOSAL_REASONING: &str =
        "Patient deteriorated rapidly over the last week and requires urgent escalation.";
    const VOTE_REASONING: &str = "Concur with the attending clinical assessment.";

    fn draft(class: UrgencyClass) -> ProposalDraft {
        ProposalDraft {
            kind: ProposalKind::PatientRemoval {
                patient_ref: "p-9c21".to_string(),
            },
            urgency_class: class,
            creator_id: "dr-chen".to_string(),
            reasoning: PROPOSAL_REASONING.to_string(),
            evidence_ref: None,
        }
    }

    async fn setup() -> (Arc<ProposalStore>, LifecycleScheduler<MockRegistry>) {
        let store = Arc::new(
            ProposalStore::open_in_memory(VotingPolicy::default())
                .await
                .unwrap(),
        );
        let registry =
            Arc::new(MockRegistry::with_voters(&[("dr-chen", 5), ("dr-okafor", 5)]).await);
        let scheduler =
            LifecycleScheduler::new(store.clone(), registry, Duration::from_secs(60));
        (store, scheduler)
    }

    #[tokio::test]
    async fn test_tick_finalizes_due_proposals() {
        let (store, scheduler) = setup().await;

        let due = store.create_at(draft(UrgencyClass::Emergency), NOW).await.unwrap();
        let open = store.create_at(draft(UrgencyClass::Standard), NOW).await.unwrap();

        store
            .cast_vote_at(due.id, "dr-chen", 5, 10, VoteChoice::Approve, VOTE_REASONING, NOW + 10)
            .await
            .unwrap();
        store
            .cast_vote_at(due.id, "dr-okafor", 5, 10, VoteChoice::Approve, VOTE_REASONING, NOW + 20)
            .await
            .unwrap();

        let finalized = scheduler.tick_at(due.voting_deadline + 1).await.unwrap();
        assert_eq!(finalized, 1);

        assert_eq!(
            store.get(due.id).await.unwrap().status,
            ProposalStatus::Approved
        );
        assert_eq!(
            store.get(open.id).await.unwrap().status,
            ProposalStatus::Active
        );
    }

    #[tokio::test]
    async fn test_tick_expires_silent_proposals() {
        let (store, scheduler) = setup().await;
        let proposal = store.create_at(draft(UrgencyClass::Standard), NOW).await.unwrap();

        scheduler.tick_at(proposal.voting_deadline + 1).await.unwrap();
        assert_eq!(
            store.get(proposal.id).await.unwrap().status,
            ProposalStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_overlapping_ticks_are_idempotent() {
        let (store, scheduler) = setup().await;
        let proposal = store.create_at(draft(UrgencyClass::Emergency), NOW).await.unwrap();
        let after = proposal.voting_deadline + 1;

        assert_eq!(scheduler.tick_at(after).await.unwrap(), 1);
        assert_eq!(scheduler.tick_at(after).await.unwrap(), 0);
        assert_eq!(scheduler.tick_at(after + 60).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_registry_outage_leaves_proposals_pending() {
        let store = Arc::new(
            ProposalStore::open_in_memory(VotingPolicy::default())
                .await
                .unwrap(),
        );
        let registry = Arc::new(MockRegistry::with_voters(&[("dr-chen", 5)]).await);
        let scheduler =
            LifecycleScheduler::new(store.clone(), registry.clone(), Duration::from_secs(60));

        let proposal = store.create_at(draft(UrgencyClass::Emergency), NOW).await.unwrap();
        registry.set_unavailable(true);

        let result = scheduler.tick_at(proposal.voting_deadline + 1).await;
        assert!(matches!(result, Err(CouncilError::Unavailable(_))));
        assert_eq!(
            store.get(proposal.id).await.unwrap().status,
            ProposalStatus::Active
        );

        registry.set_unavailable(false);
        assert_eq!(scheduler.tick_at(proposal.voting_deadline + 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_total_power_sampled_at_finalize_time() {
        let store = Arc::new(
            ProposalStore::open_in_memory(VotingPolicy::default())
                .await
                .unwrap(),
        );
        let registry = Arc::new(MockRegistry::with_voters(&[("dr-chen", 5), ("dr-okafor", 5)]).await);
        let scheduler =
            LifecycleScheduler::new(store.clone(), registry.clone(), Duration::from_secs(60));

        let proposal = store.create_at(draft(UrgencyClass::Standard), NOW).await.unwrap();
        store
            .cast_vote_at(proposal.id, "dr-chen", 5, 10, VoteChoice::Approve, VOTE_REASONING, NOW + 10)
            .await
            .unwrap();

        // dr-okafor is revoked mid-vote: total power drops from 10 to 5,
        // so dr-chen's 5 approve power is now 100% approval
        registry.remove_voter("dr-okafor").await;
        scheduler.tick_at(proposal.voting_deadline + 1).await.unwrap();

        let finalized = store.get(proposal.id).await.unwrap();
        assert_eq!(finalized.status, ProposalStatus::Approved);
        assert_eq!(finalized.tally.total_power_at_snapshot, 5);
    }
}
