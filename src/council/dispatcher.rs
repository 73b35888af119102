//! Execution dispatcher: hands approved proposals to the allocation ledger.
//!
//! Each approved proposal becomes one type-specific `MutationRequest` with
//! a deterministic idempotency key derived from the proposal id, so a
//! retried call is deduplicated on the ledger side. On ledger failure the
//! proposal stays Approved and the next sweep retries; `mark_executed` is
//! the only confirmation of success.

use crate::council::error::{CouncilError, CouncilResult};
use crate::council::proposal::{Proposal, ProposalKind, ProposalStatus};
use crate::council::retry::retry_with_backoff;
use crate::council::store::ProposalStore;
use crate::ledger::traits::{AllocationLedger, LedgerError, MutationOp, MutationRequest};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

const LEDGER_TIMEOUT: Duration = Duration::from_secs(10);

/// Deterministic per-proposal idempotency key.
pub fn idempotency_key(proposal_id: i64) -> String {
    let digest = Sha256::digest(format!("lifeboard-execution:{}", proposal_id).as_bytes());
    hex::encode(digest)
}

/// Build the ledger mutation for an approved proposal.
fn mutation_request(proposal: &Proposal) -> MutationRequest {
    let op = match &proposal.kind {
        ProposalKind::UrgencyUpdate {
            patient_ref,
            current,
            proposed,
        } => MutationOp::UpdateUrgency {
            patient_ref: patient_ref.clone(),
            from: *current,
            to: *proposed,
        },
        ProposalKind::PatientRemoval { patient_ref } => MutationOp::DeactivatePatient {
            patient_ref: patient_ref.clone(),
        },
        ProposalKind::SystemParameter {
            parameter,
            current,
            proposed,
        } => MutationOp::SetParameter {
            parameter: parameter.clone(),
            from: *current,
            to: *proposed,
        },
        ProposalKind::EmergencyOverride { subject_ref } => MutationOp::Override {
            subject_ref: subject_ref.clone(),
        },
    };
    MutationRequest {
        proposal_id: proposal.id,
        op,
        idempotency_key: idempotency_key(proposal.id),
    }
}

/// Periodic execution sweep over approved proposals.
pub struct ExecutionDispatcher<L: AllocationLedger> {
    store: Arc<ProposalStore>,
    ledger: Arc<L>,
    tick_interval: Duration,
}

impl<L: AllocationLedger> ExecutionDispatcher<L> {
    pub fn new(store: Arc<ProposalStore>, ledger: Arc<L>, tick_interval: Duration) -> Self {
        Self {
            store,
            ledger,
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
                Ok(executed) if executed > 0 => {
                    tracing::info!(executed, "execution sweep complete");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "execution sweep failed");
                }
            }
        }
    }

    /// One sweep over approved proposals. Returns how many executed.
    pub async fn tick(&self) -> CouncilResult<usize> {
        let pending = self.store.pending_execution().await?;
        let mut executed = 0;
        for proposal_id in pending {
            match self.execute(proposal_id).await {
                Ok(_) => executed += 1,
                Err(e) => {
                    // proposal stays Approved; retried next sweep
                    tracing::warn!(proposal = proposal_id, error = %e, "execution failed");
                }
            }
        }
        Ok(executed)
    }

    /// Execute one approved proposal.
    ///
    /// An already-executed proposal is a no-op confirmation returning the
    /// existing record; anything else non-Approved is an error.
    pub async fn execute(&self, proposal_id: i64) -> CouncilResult<Proposal> {
        let proposal = self.store.get(proposal_id).await?;
        match proposal.status {
            ProposalStatus::Approved => {}
            ProposalStatus::Executed => return Ok(proposal),
            other => {
                return Err(CouncilError::InvalidState {
                    id: proposal_id,
                    reason: format!("cannot execute a {} proposal", other.as_str()),
                })
            }
        }

        let request = mutation_request(&proposal);
        let execution_ref = retry_with_backoff(
            || async {
                match timeout(LEDGER_TIMEOUT, self.ledger.apply(&request)).await {
                    Ok(result) => result,
                    Err(_) => Err(LedgerError::Unavailable(
                        "allocation ledger timed out".to_string(),
                    )),
                }
            },
            LedgerError::is_transient,
        )
        .await
        .map_err(|e| match e {
            LedgerError::Rejected(reason) => CouncilError::InvalidState {
                id: proposal_id,
                reason: format!("ledger rejected mutation: {}", reason),
            },
            other => CouncilError::Unavailable(other.to_string()),
        })?;

        tracing::info!(
            proposal = proposal_id,
            execution_ref = %execution_ref.0,
            "mutation applied"
        );

        match self.store.mark_executed(proposal_id, &execution_ref.0).await {
            Ok(proposal) => Ok(proposal),
            // a racing run confirmed it first
            Err(CouncilError::AlreadyExecuted(_)) => self.store.get(proposal_id).await,
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::policy::VotingPolicy;
    use crate::council::proposal::{ProposalDraft, UrgencyClass, VoteChoice};
    use crate::ledger::mock::MockLedger;

    const NOW: i64 = 1_700_000_000;
    const PROPOSAL_REASONING: &str =
        "Patient deteriorated rapidly over the last week and requires urgent escalation.";
    const VOTE_REASONING: &str = "Concur with the attending clinical assessment.";

    async fn setup() -> (Arc<ProposalStore>, Arc<MockLedger>, ExecutionDispatcher<MockLedger>) {
        let store = Arc::new(
            ProposalStore::open_in_memory(VotingPolicy::default())
                .await
                .unwrap(),
        );
        let ledger = Arc::new(MockLedger::new());
        let dispatcher =
            ExecutionDispatcher::new(store.clone(), ledger.clone(), Duration::from_secs(30));
        (store, ledger, dispatcher)
    }

    async fn approved_proposal(store: &ProposalStore, kind: ProposalKind) -> Proposal {
        let proposal = store
            .create_at(
                ProposalDraft {
                    kind,
                    urgency_class: UrgencyClass::Standard,
                    creator_id: "dr-chen".to_string(),
                    reasoning: PROPOSAL_REASONING.to_string(),
                    evidence_ref: None,
                },
                NOW,
            )
            .await
            .unwrap();
        store
            .cast_vote_at(proposal.id, "dr-chen", 8, 10, VoteChoice::Approve, VOTE_REASONING, NOW + 10)
            .await
            .unwrap();
        store
            .finalize_at_deadline_at(proposal.id, 10, proposal.voting_deadline + 1)
            .await
            .unwrap()
    }

    fn urgency_kind() -> ProposalKind {
        ProposalKind::UrgencyUpdate {
            patient_ref: "p-7f3a".to_string(),
            current: 3,
            proposed: 8,
        }
    }

    #[tokio::test]
    async fn test_execute_applies_mutation_and_marks_executed() {
        let (store, ledger, dispatcher) = setup().await;
        let proposal = approved_proposal(&store, urgency_kind()).await;

        let executed = dispatcher.execute(proposal.id).await.unwrap();
        assert_eq!(executed.status, ProposalStatus::Executed);
        assert!(executed.execution_ref.is_some());

        let applied = ledger.applied().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].proposal_id, proposal.id);
        assert_eq!(applied[0].idempotency_key, idempotency_key(proposal.id));
        assert_eq!(
            applied[0].op,
            MutationOp::UpdateUrgency {
                patient_ref: "p-7f3a".to_string(),
                from: 3,
                to: 8,
            }
        );
    }

    #[tokio::test]
    async fn test_execute_twice_applies_once() {
        let (store, ledger, dispatcher) = setup().await;
        let proposal = approved_proposal(&store, urgency_kind()).await;

        let first = dispatcher.execute(proposal.id).await.unwrap();
        let second = dispatcher.execute(proposal.id).await.unwrap();
        assert_eq!(second.status, ProposalStatus::Executed);
        assert_eq!(second.execution_ref, first.execution_ref);
        assert_eq!(ledger.applied().await.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_transient_failure() {
        let (store, ledger, dispatcher) = setup().await;
        let proposal = approved_proposal(&store, urgency_kind()).await;

        ledger.fail_next(1);
        let executed = dispatcher.execute(proposal.id).await.unwrap();
        assert_eq!(executed.status, ProposalStatus::Executed);
        assert_eq!(ledger.applied().await.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_requires_approved() {
        let (store, _ledger, dispatcher) = setup().await;
        let proposal = store
            .create_at(
                ProposalDraft {
                    kind: urgency_kind(),
                    urgency_class: UrgencyClass::Standard,
                    creator_id: "dr-chen".to_string(),
                    reasoning: PROPOSAL_REASONING.to_string(),
                    evidence_ref: None,
                },
                NOW,
            )
            .await
            .unwrap();

        let result = dispatcher.execute(proposal.id).await;
        assert!(matches!(result, Err(CouncilError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_tick_executes_all_pending() {
        let (store, ledger, dispatcher) = setup().await;
        let first = approved_proposal(&store, urgency_kind()).await;
        let second = approved_proposal(
            &store,
            ProposalKind::PatientRemoval {
                patient_ref: "p-9c21".to_string(),
            },
        )
        .await;

        assert_eq!(dispatcher.tick().await.unwrap(), 2);
        assert_eq!(ledger.applied().await.len(), 2);
        assert_eq!(
            store.get(first.id).await.unwrap().status,
            ProposalStatus::Executed
        );
        assert_eq!(
            store.get(second.id).await.unwrap().status,
            ProposalStatus::Executed
        );

        // nothing left to do
        assert_eq!(dispatcher.tick().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutation_request_per_kind() {
        let proposal = Proposal {
            id: 7,
            kind: ProposalKind::SystemParameter {
                parameter: "max_cold_ischemia_hours".to_string(),
                current: 24,
                proposed: 30,
            },
            urgency_class: UrgencyClass::Standard,
            creator_id: "dr-chen".to_string(),
            reasoning: PROPOSAL_REASONING.to_string(),
            evidence_ref: None,
            created_at: NOW,
            voting_deadline: NOW + 1,
            status: ProposalStatus::Approved,
            tally: Default::default(),
            finalized_at: Some(NOW + 2),
            executed_at: None,
            execution_ref: None,
        };
        let request = mutation_request(&proposal);
        assert_eq!(
            request.op,
            MutationOp::SetParameter {
                parameter: "max_cold_ischemia_hours".to_string(),
                from: 24,
                to: 30,
            }
        );
        assert_eq!(request.idempotency_key, idempotency_key(7));

        // key is deterministic and proposal-specific
        assert_eq!(idempotency_key(7), idempotency_key(7));
        assert_ne!(idempotency_key(7), idempotency_key(8));
    }
}
