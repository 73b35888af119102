//! Journal ledger: append-only JSONL hand-off file.
//!
//! Each applied mutation becomes one JSON line consumed by the downstream
//! ledger bridge. Idempotency keys are loaded at open and checked before
//! every append, so a replayed request returns the original execution
//! reference without writing a second line.

use crate::ledger::traits::{
    AllocationLedger, ExecutionRef, LedgerError, LedgerResult, MutationRequest,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Serialize, Deserialize)]
struct JournalRecord {
    applied_at: i64,
    execution_ref: String,
    #[serde(flatten)]
    request: MutationRequest,
}

/// Append-only JSONL allocation journal.
pub struct JournalLedger {
    path: PathBuf,
    seen_keys: Mutex<HashSet<String>>,
}

impl JournalLedger {
    /// Open the journal, loading idempotency keys from existing records.
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        let mut seen_keys = HashSet::new();
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                for line in raw.lines().filter(|l| !l.trim().is_empty()) {
                    let record: JournalRecord = serde_json::from_str(line)
                        .map_err(|e| LedgerError::Io(format!("corrupt journal line: {}", e)))?;
                    seen_keys.insert(record.request.idempotency_key);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LedgerError::Io(format!("{}: {}", path.display(), e))),
        }
        Ok(Self {
            path,
            seen_keys: Mutex::new(seen_keys),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn execution_ref(request: &MutationRequest) -> ExecutionRef {
        ExecutionRef(format!("journal:{}", &request.idempotency_key[..16.min(request.idempotency_key.len())]))
    }
}

#[async_trait]
impl AllocationLedger for JournalLedger {
    async fn apply(&self, request: &MutationRequest) -> LedgerResult<ExecutionRef> {
        let mut seen = self.seen_keys.lock().await;
        let execution_ref = Self::execution_ref(request);
        if seen.contains(&request.idempotency_key) {
            return Ok(execution_ref);
        }

        let record = JournalRecord {
            applied_at: crate::council::now_secs(),
            execution_ref: execution_ref.0.clone(),
            request: request.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| LedgerError::Io(format!("serialize journal record: {}", e)))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Io(format!("{}: {}", self.path.display(), e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| LedgerError::Io(format!("{}: {}", self.path.display(), e)))?;

        seen.insert(request.idempotency_key.clone());
        Ok(execution_ref)
    }
}
