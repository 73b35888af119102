//! Allocation ledger: the external collaborator that mutates the
//! allocation table.
//!
//! The council never touches the allocation queue directly; approved
//! proposals become `MutationRequest`s handed to this trait. Requests carry
//! a deterministic idempotency key so a retried call is deduplicated on the
//! ledger side.

pub mod journal;
pub mod mock;
pub mod traits;

pub use journal::JournalLedger;
pub use mock::MockLedger;
pub use traits::{AllocationLedger, ExecutionRef, LedgerError, LedgerResult, MutationOp, MutationRequest};
