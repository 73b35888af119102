//! Run the council service.
//!
//! Starts the deadline scheduler and the execution dispatcher as background
//! tasks and waits for ctrl-c. Proposal creation and voting go through the
//! other subcommands (or library callers) against the same database.

use super::config::{resolve_config, LifeboardConfig};
use lifeboard::council::{ExecutionDispatcher, LifecycleScheduler};
use lifeboard::ledger::JournalLedger;
use lifeboard::registry::FileRoster;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    init_logging(&config);

    // fail fast on a broken roster instead of at the first sweep
    let roster_entries = FileRoster::check(&config.roster.path)?;

    let store = super::open_store(&config).await?;
    let registry = Arc::new(FileRoster::new(&config.roster.path));
    let ledger = Arc::new(JournalLedger::open(&config.ledger.journal_path)?);

    let scheduler = LifecycleScheduler::new(
        store.clone(),
        registry.clone(),
        config.scheduler_interval()?,
    );
    let dispatcher =
        ExecutionDispatcher::new(store.clone(), ledger.clone(), config.dispatcher_interval()?);

    tracing::info!(
        db = %config.storage.db_path.display(),
        roster = %config.roster.path.display(),
        roster_entries,
        journal = %ledger.path().display(),
        "lifeboard council service started"
    );

    let scheduler_task = tokio::spawn(async move { scheduler.run().await });
    let dispatcher_task = tokio::spawn(async move { dispatcher.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    scheduler_task.abort();
    dispatcher_task.abort();

    Ok(())
}

fn init_logging(config: &LifeboardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
