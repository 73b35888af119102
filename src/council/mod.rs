//! Council module: proposal lifecycle, voting, and execution dispatch.
//!
//! - Proposal/Vote data model and validation
//! - Tally engine (pure outcome computation)
//! - ProposalStore: SQLite-backed state machine, one transaction per mutation
//! - LifecycleScheduler: deadline finalization sweep
//! - ExecutionDispatcher: approved-proposal hand-off to the allocation ledger

pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod policy;
pub mod proposal;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tally;

#[cfg(test)]
mod proptests;

pub use credential::{EmergencyCredential, SuppliedSecret};
pub use dispatcher::ExecutionDispatcher;
pub use error::{CouncilError, CouncilResult};
pub use policy::VotingPolicy;
pub use proposal::{
    Proposal, ProposalDraft, ProposalKind, ProposalStatus, Tally, UrgencyClass, Vote, VoteChoice,
};
pub use scheduler::LifecycleScheduler;
pub use service::CouncilService;
pub use store::ProposalStore;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as unix seconds.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
