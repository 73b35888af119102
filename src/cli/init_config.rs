//! Write a default config and example roster.
//!
//! Prompts for the shared emergency credential and stores only its SHA-256
//! digest. The roster starts with commented example entries so the
//! administrative side fills in the real reviewer weights.

use super::config::{default_config_path, LifeboardConfig};
use lifeboard::council::EmergencyCredential;
use std::fs;
use std::path::PathBuf;

const EXAMPLE_ROSTER: &str = r#"# Lifeboard voter roster
#
# One [[voter]] block per credentialed reviewer. Voting power is an
# administratively assigned weight from 1 to 10. Revoking a reviewer
# (authorized = false) takes effect at the next registry sample; votes
# already cast keep their snapshot weight.
#
# [[voter]]
# id = "dr-chen"
# voting_power = 5
# authorized = true
# can_create_proposals = true
#
# [[voter]]
# id = "dr-okafor"
# voting_power = 3
"#;

pub async fn execute(
    config_path: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    if path.exists() && !force {
        return Err(format!(
            "Config already exists: {} (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    let data_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&data_dir)?;

    let secret = rpassword::prompt_password("Choose the shared emergency credential: ")
        .map_err(|e| format!("Failed to read credential from stdin: {}", e))?;
    if secret.trim().is_empty() {
        return Err("Emergency credential cannot be empty".into());
    }
    let credential = EmergencyCredential::from_secret(secret.trim());

    let config = LifeboardConfig::default_in(&data_dir, &credential.digest_hex());
    config.save(&path)?;
    println!("Created: {}", path.display());

    if config.roster.path.exists() {
        println!("Roster exists: {} (left untouched)", config.roster.path.display());
    } else {
        fs::write(&config.roster.path, EXAMPLE_ROSTER)?;
        println!("Created: {} (edit it to add reviewers)", config.roster.path.display());
    }

    println!();
    println!("Next steps:");
    println!("  1. Add reviewers to {}", config.roster.path.display());
    println!("  2. Start the service: lifeboard run --config {}", path.display());

    Ok(())
}
