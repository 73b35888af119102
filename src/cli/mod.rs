use clap::{Parser, Subcommand};
use lifeboard::council::{CouncilService, EmergencyCredential, ProposalStore, VotingPolicy};
use lifeboard::registry::FileRoster;
use std::sync::Arc;

pub mod config;
pub mod execute;
pub mod finalize;
pub mod init_config;
pub mod propose;
pub mod run;
pub mod show;
pub mod version;
pub mod vote;
pub mod votes;

#[derive(Parser)]
#[command(name = "lifeboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the allocation exception council", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the council service (deadline scheduler + execution dispatcher)
    Run {
        /// Path to config file (default: ~/.local/share/lifeboard/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Create a proposal
    Propose {
        #[arg(long)]
        config: Option<String>,

        /// Reviewer id acting as the proposal creator
        #[arg(long = "as")]
        creator: String,

        /// Proposal kind: urgency-update, patient-removal, system-parameter,
        /// or emergency-override
        #[arg(long)]
        kind: String,

        /// Urgency class: standard or emergency
        #[arg(long, default_value = "standard")]
        urgency: String,

        /// Patient hash or parameter key (required for all kinds except
        /// emergency-override)
        #[arg(long)]
        subject: Option<String>,

        /// Current value (urgency-update and system-parameter)
        #[arg(long)]
        current: Option<i64>,

        /// Proposed value (urgency-update and system-parameter)
        #[arg(long)]
        proposed: Option<i64>,

        /// Clinical reasoning (at least 50 characters)
        #[arg(long)]
        reasoning: String,

        /// Optional evidence reference (case number, document id)
        #[arg(long)]
        evidence: Option<String>,
    },

    /// Cast a vote on an active proposal
    Vote {
        #[arg(long)]
        config: Option<String>,

        /// Reviewer id casting the vote
        #[arg(long = "as")]
        voter: String,

        /// Proposal id
        proposal_id: i64,

        /// Vote choice: approve, reject, or abstain
        #[arg(long)]
        choice: String,

        /// Vote reasoning (at least 20 characters)
        #[arg(long)]
        reasoning: String,
    },

    /// Emergency-finalize a proposal (requires the shared credential)
    Finalize {
        #[arg(long)]
        config: Option<String>,

        /// Proposal id
        proposal_id: i64,

        /// Path to a file containing the emergency secret
        /// (prompts on stdin if not specified)
        #[arg(long)]
        secret_file: Option<String>,
    },

    /// Retry execution of an approved proposal
    Execute {
        #[arg(long)]
        config: Option<String>,

        /// Proposal id
        proposal_id: i64,
    },

    /// Show a proposal snapshot (status, tally, timestamps)
    Show {
        #[arg(long)]
        config: Option<String>,

        /// Proposal id
        proposal_id: i64,
    },

    /// List votes for a proposal in cast order
    Votes {
        #[arg(long)]
        config: Option<String>,

        /// Proposal id
        proposal_id: i64,
    },

    /// Write a default config and example roster
    InitConfig {
        /// Target config path (default: ~/.local/share/lifeboard/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => run::execute(config).await,
        Commands::Propose {
            config,
            creator,
            kind,
            urgency,
            subject,
            current,
            proposed,
            reasoning,
            evidence,
        } => {
            propose::execute(
                config, creator, kind, urgency, subject, current, proposed, reasoning, evidence,
            )
            .await
        }
        Commands::Vote {
            config,
            voter,
            proposal_id,
            choice,
            reasoning,
        } => vote::execute(config, voter, proposal_id, choice, reasoning).await,
        Commands::Finalize {
            config,
            proposal_id,
            secret_file,
        } => finalize::execute(config, proposal_id, secret_file).await,
        Commands::Execute {
            config,
            proposal_id,
        } => execute::execute(config, proposal_id).await,
        Commands::Show {
            config,
            proposal_id,
        } => show::execute(config, proposal_id).await,
        Commands::Votes {
            config,
            proposal_id,
        } => votes::execute(config, proposal_id).await,
        Commands::InitConfig { config, force } => init_config::execute(config, force).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

/// Open the proposal store named by the config.
pub(crate) async fn open_store(
    config: &config::LifeboardConfig,
) -> Result<Arc<ProposalStore>, Box<dyn std::error::Error>> {
    if let Some(parent) = config.storage.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = ProposalStore::open(&config.storage.db_path, VotingPolicy::default()).await?;
    Ok(Arc::new(store))
}

/// Wire the council service from config (store + roster + credential).
pub(crate) async fn open_service(
    config: &config::LifeboardConfig,
) -> Result<CouncilService<FileRoster>, Box<dyn std::error::Error>> {
    let store = open_store(config).await?;
    let registry = Arc::new(FileRoster::new(&config.roster.path));
    let credential = EmergencyCredential::from_digest_hex(&config.emergency.secret_sha256)?;
    Ok(CouncilService::new(store, registry, credential))
}
