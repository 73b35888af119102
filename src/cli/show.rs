//! Show a proposal snapshot.

use super::config::resolve_config;

pub async fn execute(
    config_path: Option<String>,
    proposal_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    let service = super::open_service(&config).await?;

    let proposal = service.get_proposal(proposal_id).await?;
    println!("{}", serde_json::to_string_pretty(&proposal)?);
    Ok(())
}
