//! Cast a vote on an active proposal.

use super::config::resolve_config;
use lifeboard::council::VoteChoice;

pub async fn execute(
    config_path: Option<String>,
    voter: String,
    proposal_id: i64,
    choice: String,
    reasoning: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    let service = super::open_service(&config).await?;

    let choice = VoteChoice::parse(&choice).ok_or_else(|| {
        format!(
            "Unknown vote choice: {}. Use 'approve', 'reject', or 'abstain'.",
            choice
        )
    })?;

    let vote = service
        .cast_vote(proposal_id, &voter, choice, &reasoning)
        .await?;
    println!("{}", serde_json::to_string_pretty(&vote)?);

    let proposal = service.get_proposal(proposal_id).await?;
    eprintln!(
        "Tally: {} for / {} against / {} abstain (participation {:.0}%)",
        proposal.tally.votes_for,
        proposal.tally.votes_against,
        proposal.tally.votes_abstain,
        proposal.tally.participation_rate() * 100.0
    );
    Ok(())
}
