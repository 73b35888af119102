//! Lifeboard - Allocation Exception Council
//!
//! A weighted-vote governance service for an automated organ-allocation
//! queue. A fixed roster of credentialed reviewers proposes exceptions
//! (urgency changes, patient removals, parameter changes, emergency
//! overrides) and decides them by weighted vote.
//!
//! Key principles:
//! - The proposal/vote state machine lives in one SQLite transaction unit
//! - Voting power is snapshotted at vote time, total power at finalize time
//! - Terminal states are monotone; finalization is idempotent
//! - External collaborators (voter registry, allocation ledger) sit behind
//!   traits with bounded timeouts and caller-side retry

pub mod council;
pub mod ledger;
pub mod registry;
