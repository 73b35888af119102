//! Mock allocation ledger for tests.

use crate::ledger::traits::{
    AllocationLedger, ExecutionRef, LedgerError, LedgerResult, MutationRequest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory ledger recording applied mutations, with idempotency-key
/// deduplication and transient-failure injection.
#[derive(Clone, Default)]
pub struct MockLedger {
    applied: Arc<Mutex<Vec<MutationRequest>>>,
    refs_by_key: Arc<Mutex<HashMap<String, ExecutionRef>>>,
    /// Number of upcoming apply calls that fail as Unavailable.
    fail_next: Arc<AtomicU32>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` apply calls fail with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Mutations actually applied (deduplicated replays excluded).
    pub async fn applied(&self) -> Vec<MutationRequest> {
        self.applied.lock().await.clone()
    }
}

#[async_trait]
impl AllocationLedger for MockLedger {
    async fn apply(&self, request: &MutationRequest) -> LedgerResult<ExecutionRef> {
        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(LedgerError::Unavailable("injected outage".to_string()));
        }

        let mut refs = self.refs_by_key.lock().await;
        if let Some(existing) = refs.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        let execution_ref = ExecutionRef(format!("mock:{}", request.proposal_id));
        refs.insert(request.idempotency_key.clone(), execution_ref.clone());
        self.applied.lock().await.push(request.clone());
        Ok(execution_ref)
    }
}
