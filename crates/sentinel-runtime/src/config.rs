//! JSON configuration file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sentinel_core::ServerSlot;
use sentinel_logwatch::DEFAULT_POLL_INTERVAL;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    pub state_file: PathBuf,
    #[serde(default)]
    pub player_ledger: Option<PathBuf>,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_minutes: i64,
    #[serde(default = "default_true")]
    pub servers_check_enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_stop_grace")]
    pub stop_grace_secs: u64,
    #[serde(default = "default_stop_command")]
    pub stop_command: String,
    /// Trigger-name filter; empty enables the whole catalogue.
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub tmux: TmuxConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Reconcile reports; falls back to `webhook_url`.
    #[serde(default)]
    pub status_webhook_url: Option<String>,
    /// Every log line of a slot is mirrored to that slot's webhook.
    #[serde(default)]
    pub slot_webhooks: BTreeMap<ServerSlot, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TmuxConfig {
    #[serde(default)]
    pub socket_path: Option<String>,
    #[serde(default)]
    pub socket_name: Option<String>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/opt/sentinel/serverslog")
}

fn default_reconcile_interval() -> i64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    u64::try_from(DEFAULT_POLL_INTERVAL.as_millis()).unwrap_or(100)
}

fn default_stop_grace() -> u64 {
    2
}

fn default_stop_command() -> String {
    "stop".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks serde cannot express. The reconcile interval is validated
    /// where the loop is built, so `sentinel reconcile` works without it.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.stop_command.trim().is_empty() {
            return Err(ConfigError::Invalid("stop_command must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn status_webhook_url(&self) -> Option<&str> {
        self.notifications
            .status_webhook_url
            .as_deref()
            .or(self.notifications.webhook_url.as_deref())
    }
}
