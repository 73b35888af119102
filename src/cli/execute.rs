//! Retry execution of an approved proposal.
//!
//! The running service retries execution on its own sweep; this command is
//! the manual path for an operator who wants the hand-off now. Safe to
//! repeat: execution is idempotent by proposal id.

use super::config::resolve_config;
use lifeboard::council::ExecutionDispatcher;
use lifeboard::ledger::JournalLedger;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(
    config_path: Option<String>,
    proposal_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    let store = super::open_store(&config).await?;
    let ledger = Arc::new(JournalLedger::open(&config.ledger.journal_path)?);

    let dispatcher = ExecutionDispatcher::new(store, ledger, Duration::from_secs(30));
    let proposal = dispatcher.execute(proposal_id).await?;

    println!("{}", serde_json::to_string_pretty(&proposal)?);
    Ok(())
}
