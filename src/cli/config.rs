//! Lifeboard configuration file handling
//!
//! Operator configuration only - deployment settings (paths, intervals,
//! logging) that the service runner controls. Voting policy (windows,
//! quorum, thresholds) is fixed in code; voter credentials live in the
//! roster file maintained by the administrative side.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default deadline sweep interval
const DEFAULT_SCHEDULER_INTERVAL: &str = "60s";

/// Default execution sweep interval
const DEFAULT_DISPATCHER_INTERVAL: &str = "30s";

/// Lifeboard service configuration (operator settings only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeboardConfig {
    /// Proposal/vote database configuration
    pub storage: StorageConfig,

    /// Voter roster configuration
    pub roster: RosterConfig,

    /// Emergency credential configuration
    pub emergency: EmergencyConfig,

    /// Allocation journal hand-off configuration
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding proposals and votes
    pub db_path: PathBuf,
}

/// Roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Path to the TOML voter roster, re-read on every registry call
    pub path: PathBuf,
}

/// Emergency credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// SHA-256 digest (hex) of the shared emergency credential.
    /// The secret itself is never stored.
    pub secret_sha256: String,
}

/// Ledger hand-off configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path to the append-only JSONL journal consumed by the ledger bridge
    pub journal_path: PathBuf,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Deadline sweep interval (humantime format, e.g. "60s", "2m")
    #[serde(default = "default_scheduler_interval")]
    pub interval: String,
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Execution sweep interval (humantime format)
    #[serde(default = "default_dispatcher_interval")]
    pub interval: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_scheduler_interval() -> String {
    DEFAULT_SCHEDULER_INTERVAL.to_string()
}

fn default_dispatcher_interval() -> String {
    DEFAULT_DISPATCHER_INTERVAL.to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: default_scheduler_interval(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            interval: default_dispatcher_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LifeboardConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: LifeboardConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Default configuration rooted at the given data directory.
    pub fn default_in(data_dir: &Path, secret_digest_hex: &str) -> Self {
        Self {
            storage: StorageConfig {
                db_path: data_dir.join("lifeboard.db"),
            },
            roster: RosterConfig {
                path: data_dir.join("roster.toml"),
            },
            emergency: EmergencyConfig {
                secret_sha256: secret_digest_hex.to_string(),
            },
            ledger: LedgerConfig {
                journal_path: data_dir.join("allocation-journal.jsonl"),
            },
            scheduler: SchedulerConfig::default(),
            dispatcher: DispatcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn scheduler_interval(&self) -> Result<Duration, String> {
        parse_interval("scheduler.interval", &self.scheduler.interval)
    }

    pub fn dispatcher_interval(&self) -> Result<Duration, String> {
        parse_interval("dispatcher.interval", &self.dispatcher.interval)
    }
}

fn parse_interval(field: &str, value: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(value)
        .map_err(|e| format!("invalid {}: {}", field, e))?;
    if duration.is_zero() {
        return Err(format!("invalid {}: must be non-zero", field));
    }
    Ok(duration)
}

/// Default data directory: ~/.local/share/lifeboard
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lifeboard")
}

/// Default config path: ~/.local/share/lifeboard/config.toml
pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Resolve and load the config for a subcommand.
pub fn resolve_config(
    config_path: Option<String>,
) -> Result<LifeboardConfig, Box<dyn std::error::Error>> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    if !path.exists() {
        return Err(format!(
            "Config not found: {} (run `lifeboard init-config` first)",
            path.display()
        )
        .into());
    }
    LifeboardConfig::load(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LifeboardConfig {
        LifeboardConfig::default_in(Path::new("/var/lib/lifeboard"), "ab".repeat(32).as_str())
    }

    #[test]
    fn test_default_paths() {
        let config = sample();
        assert_eq!(
            config.storage.db_path,
            PathBuf::from("/var/lib/lifeboard/lifeboard.db")
        );
        assert_eq!(
            config.ledger.journal_path,
            PathBuf::from("/var/lib/lifeboard/allocation-journal.jsonl")
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = sample();
        config.save(&path).unwrap();

        let loaded = LifeboardConfig::load(&path).unwrap();
        assert_eq!(loaded.storage.db_path, config.storage.db_path);
        assert_eq!(loaded.emergency.secret_sha256, config.emergency.secret_sha256);
        assert_eq!(loaded.scheduler.interval, "60s");
    }

    #[test]
    fn test_intervals_parse() {
        let mut config = sample();
        assert_eq!(config.scheduler_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(config.dispatcher_interval().unwrap(), Duration::from_secs(30));

        config.scheduler.interval = "2m".to_string();
        assert_eq!(config.scheduler_interval().unwrap(), Duration::from_secs(120));

        config.scheduler.interval = "soon".to_string();
        assert!(config.scheduler_interval().is_err());

        config.scheduler.interval = "0s".to_string();
        assert!(config.scheduler_interval().is_err());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let raw = r#"
[storage]
db_path = "/tmp/lifeboard.db"

[roster]
path = "/tmp/roster.toml"

[emergency]
secret_sha256 = "deadbeef"

[ledger]
journal_path = "/tmp/journal.jsonl"
"#;
        let config: LifeboardConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.scheduler.interval, "60s");
        assert_eq!(config.dispatcher.interval, "30s");
        assert_eq!(config.logging.level, "info");
    }
}
