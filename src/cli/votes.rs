//! List votes for a proposal, oldest first.

use super::config::resolve_config;

pub async fn execute(
    config_path: Option<String>,
    proposal_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    let service = super::open_service(&config).await?;

    let votes = service.list_votes(proposal_id).await?;
    println!("{}", serde_json::to_string_pretty(&votes)?);
    Ok(())
}
