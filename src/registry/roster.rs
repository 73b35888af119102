//! TOML roster file registry.
//!
//! The roster is re-read on every call: administrative edits (revoking a
//! voter, changing a weight) are picked up at the next resolve or
//! total-power sample without a restart. Already-cast votes keep their
//! snapshot power.
//!
//! Format:
//!
//! ```toml
//! [[voter]]
//! id = "dr-chen"
//! voting_power = 5
//! authorized = true
//! can_create_proposals = true
//! ```

use crate::council::policy::{MAX_VOTING_POWER, MIN_VOTING_POWER};
use crate::registry::traits::{RegistryError, RegistryResult, VoterProfile, VoterRegistry};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    voter: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    id: String,
    voting_power: u64,
    #[serde(default = "default_true")]
    authorized: bool,
    #[serde(default)]
    can_create_proposals: bool,
}

fn default_true() -> bool {
    true
}

/// Roster-file-backed voter registry.
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> RegistryResult<RosterFile> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            RegistryError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let roster: RosterFile = toml::from_str(&raw)
            .map_err(|e| RegistryError::InvalidRoster(e.to_string()))?;
        validate(&roster)?;
        Ok(roster)
    }

    /// Validate a roster file without serving from it (init-config check).
    pub fn check(path: &Path) -> RegistryResult<usize> {
        let roster = FileRoster::new(path).load()?;
        Ok(roster.voter.len())
    }
}

fn validate(roster: &RosterFile) -> RegistryResult<()> {
    let mut seen = HashSet::new();
    for entry in &roster.voter {
        if entry.id.trim().is_empty() {
            return Err(RegistryError::InvalidRoster(
                "voter id must not be empty".to_string(),
            ));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(RegistryError::InvalidRoster(format!(
                "duplicate voter id: {}",
                entry.id
            )));
        }
        if !(MIN_VOTING_POWER..=MAX_VOTING_POWER).contains(&entry.voting_power) {
            return Err(RegistryError::InvalidRoster(format!(
                "voter {} has voting power {} outside {}..={}",
                entry.id, entry.voting_power, MIN_VOTING_POWER, MAX_VOTING_POWER
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl VoterRegistry for FileRoster {
    async fn resolve(&self, identity: &str) -> RegistryResult<VoterProfile> {
        let roster = self.load()?;
        let entry = roster
            .voter
            .iter()
            .find(|v| v.id == identity)
            .ok_or_else(|| RegistryError::UnknownVoter(identity.to_string()))?;
        Ok(VoterProfile {
            voter_id: entry.id.clone(),
            voting_power: entry.voting_power,
            is_authorized_voter: entry.authorized,
            can_create_proposals: entry.authorized && entry.can_create_proposals,
        })
    }

    async fn total_eligible_voting_power(&self) -> RegistryResult<u64> {
        let roster = self.load()?;
        Ok(roster
            .voter
            .iter()
            .filter(|v| v.authorized)
            .map(|v| v.voting_power)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn roster_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const ROSTER: &str = r#"
[[voter]]
id = "dr-chen"
voting_power = 5
can_create_proposals = true

[[voter]]
id = "dr-okafor"
voting_power = 3

[[voter]]
id = "dr-ruiz"
voting_power = 2
authorized = false
"#;

    #[tokio::test]
    async fn test_resolve_known_voter() {
        let file = roster_file(ROSTER);
        let roster = FileRoster::new(file.path());

        let profile = roster.resolve("dr-chen").await.unwrap();
        assert_eq!(profile.voting_power, 5);
        assert!(profile.is_authorized_voter);
        assert!(profile.can_create_proposals);

        let profile = roster.resolve("dr-okafor").await.unwrap();
        assert!(profile.is_authorized_voter);
        assert!(!profile.can_create_proposals);
    }

    #[tokio::test]
    async fn test_resolve_unknown_voter() {
        let file = roster_file(ROSTER);
        let roster = FileRoster::new(file.path());
        let result = roster.resolve("dr-nobody").await;
        assert!(matches!(result, Err(RegistryError::UnknownVoter(_))));
    }

    #[tokio::test]
    async fn test_revoked_voter_is_not_authorized() {
        let file = roster_file(ROSTER);
        let roster = FileRoster::new(file.path());
        let profile = roster.resolve("dr-ruiz").await.unwrap();
        assert!(!profile.is_authorized_voter);
        assert!(!profile.can_create_proposals);
    }

    #[tokio::test]
    async fn test_total_power_counts_authorized_only() {
        let file = roster_file(ROSTER);
        let roster = FileRoster::new(file.path());
        assert_eq!(roster.total_eligible_voting_power().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let file = roster_file(
            "[[voter]]\nid = \"dr-chen\"\nvoting_power = 5\n\n[[voter]]\nid = \"dr-chen\"\nvoting_power = 3\n",
        );
        let roster = FileRoster::new(file.path());
        let result = roster.total_eligible_voting_power().await;
        assert!(matches!(result, Err(RegistryError::InvalidRoster(_))));
    }

    #[tokio::test]
    async fn test_power_out_of_range_rejected() {
        let file = roster_file("[[voter]]\nid = \"dr-chen\"\nvoting_power = 11\n");
        let roster = FileRoster::new(file.path());
        let result = roster.resolve("dr-chen").await;
        assert!(matches!(result, Err(RegistryError::InvalidRoster(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let roster = FileRoster::new("/nonexistent/roster.toml");
        let result = roster.resolve("dr-chen").await;
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));
    }

    #[test]
    fn test_check_counts_entries() {
        let file = roster_file(ROSTER);
        assert_eq!(FileRoster::check(file.path()).unwrap(), 3);
    }
}
