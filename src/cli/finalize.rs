//! Emergency-finalize a proposal.
//!
//! The shared emergency credential is read from --secret-file or prompted
//! on stdin (masked input), never taken as a command-line argument.

use super::config::resolve_config;
use lifeboard::council::SuppliedSecret;
use std::path::Path;

pub async fn execute(
    config_path: Option<String>,
    proposal_id: i64,
    secret_file: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(config_path)?;
    let service = super::open_service(&config).await?;

    let secret = read_secret(secret_file)?;
    let proposal = service.emergency_finalize(proposal_id, &secret).await?;

    println!("{}", serde_json::to_string_pretty(&proposal)?);
    Ok(())
}

fn read_secret(secret_file: Option<String>) -> Result<SuppliedSecret, Box<dyn std::error::Error>> {
    let secret = match secret_file {
        Some(path) => {
            if !Path::new(&path).exists() {
                return Err(format!("Secret file not found: {}", path).into());
            }
            std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read secret file: {}", e))?
                .trim()
                .to_string()
        }
        None => rpassword::prompt_password("Enter emergency credential: ")
            .map_err(|e| format!("Failed to read secret from stdin: {}", e))?,
    };

    if secret.is_empty() {
        return Err("Emergency credential cannot be empty".into());
    }
    Ok(SuppliedSecret::new(secret))
}
