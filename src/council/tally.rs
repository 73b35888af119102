//! Tally engine: pure outcome computation.
//!
//! Approval is measured against ALL eligible voting power, not against votes
//! cast - a unanimous handful cannot approve on behalf of a silent majority.
//! The emergency fast-path is the opposite: it looks only at cast,
//! non-abstain votes and demands a supermajority.
//!
//! All threshold checks are integer comparisons (value * 100 >= total * pct)
//! so there is no floating-point edge at the boundary and no division by a
//! zero total anywhere.

use crate::council::policy::VotingPolicy;
use crate::council::proposal::{ProposalStatus, Tally, UrgencyClass};

/// Outcome of a finalization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Approved,
    Rejected,
    Expired,
}

impl Outcome {
    pub fn status(&self) -> ProposalStatus {
        match self {
            Outcome::Approved => ProposalStatus::Approved,
            Outcome::Rejected => ProposalStatus::Rejected,
            Outcome::Expired => ProposalStatus::Expired,
        }
    }
}

/// `value / total >= pct%`, in integer arithmetic. False when total is zero.
fn meets_pct(value: u64, total: u64, pct: u64) -> bool {
    total > 0 && value * 100 >= total * pct
}

/// Natural-finalization outcome at the voting deadline.
///
/// 1. Participation below quorum: Expired (quorum never reached, outcome
///    undecided - zero votes always lands here).
/// 2. Approval at or above the class threshold: Approved.
/// 3. Otherwise: Rejected. Once quorum is met, missing the approval
///    threshold rejects regardless of the for/against ratio.
pub fn natural_outcome(
    tally: &Tally,
    total_power: u64,
    class: UrgencyClass,
    policy: &VotingPolicy,
) -> Outcome {
    if !meets_pct(tally.cast_power(), total_power, policy.quorum_pct) {
        return Outcome::Expired;
    }
    if meets_pct(tally.votes_for, total_power, policy.approval_pct(class)) {
        return Outcome::Approved;
    }
    Outcome::Rejected
}

/// Emergency-finalize outcome, over cast non-abstain votes only.
///
/// Returns `None` when no supermajority exists (including when no
/// non-abstain vote has been cast at all); a supermajority in either
/// direction ends voting early.
pub fn emergency_outcome(tally: &Tally, policy: &VotingPolicy) -> Option<Outcome> {
    let decisive = tally.decisive_power();
    if decisive == 0 {
        return None;
    }
    if meets_pct(tally.votes_for, decisive, policy.emergency_supermajority_pct) {
        return Some(Outcome::Approved);
    }
    if meets_pct(tally.votes_against, decisive, policy.emergency_supermajority_pct) {
        return Some(Outcome::Rejected);
    }
    None
}
