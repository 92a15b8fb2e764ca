use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::streak::types::AlertMode;

pub const DEFAULT_THRESHOLD: usize = 7;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_liga90_id")]
    pub liga90_id: String,
    #[serde(default = "default_reader_proxy")]
    pub reader_proxy: String,
    #[serde(default = "default_true")]
    pub include_reader: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_backoff")]
    pub backoff_secs: f64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_path")]
    pub csv_log_path: String,
}

fn default_state_path() -> String { "state.db".to_string() }
fn default_interval() -> u64 { 1800 }
fn default_liga90_id() -> String { "14072".to_string() }
fn default_reader_proxy() -> String { "https://r.jina.ai/".to_string() }
fn default_true() -> bool { true }
fn default_max_tries() -> u32 { 5 }
fn default_backoff() -> f64 { 2.0 }
fn default_timeout() -> u64 { 30 }
fn default_api_base() -> String { "https://api.telegram.org".to_string() }
fn default_csv_path() -> String { "runs.csv".to_string() }

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            state_path: default_state_path(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: default_interval() }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            liga90_id: default_liga90_id(),
            reader_proxy: default_reader_proxy(),
            include_reader: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_tries: default_max_tries(),
            backoff_secs: default_backoff(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self { api_base: default_api_base() }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            csv_logging: false,
            csv_log_path: default_csv_path(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("THRESHOLD must be a positive integer, got {0:?}")]
    InvalidThreshold(String),

    #[error("{0} not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

/// Values read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub telegram: Option<TelegramCredentials>,
    pub threshold: usize,
    pub alert_mode: AlertMode,
    pub state_path: Option<String>,
    pub dry_run: Option<bool>,
    pub liga90_id: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::info!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Environment values win over the file.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(path) = &env.state_path {
            self.system.state_path = path.clone();
        }
        if let Some(dry_run) = env.dry_run {
            self.system.dry_run = dry_run;
        }
        if let Some(id) = &env.liga90_id {
            self.sources.liga90_id = id.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram = match (non_empty("TELEGRAM_TOKEN"), non_empty("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramCredentials { token, chat_id }),
            _ => None,
        };

        let threshold = match non_empty("THRESHOLD") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidThreshold(raw).into()),
            },
            None => DEFAULT_THRESHOLD,
        };

        let alert_mode = match non_empty("ALERT_MODE") {
            Some(raw) => raw.parse::<AlertMode>().unwrap_or_else(|_| {
                warn!("Unknown ALERT_MODE {:?}, falling back to EACH", raw);
                AlertMode::Each
            }),
            None => AlertMode::default(),
        };

        let dry_run = non_empty("DRY_RUN").map(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        });

        Ok(Self {
            telegram,
            threshold,
            alert_mode,
            state_path: non_empty("STATE_PATH"),
            dry_run,
            liga90_id: non_empty("LIGA90_ID"),
        })
    }

    pub fn require_telegram(&self) -> Result<&TelegramCredentials, ConfigError> {
        self.telegram
            .as_ref()
            .ok_or(ConfigError::Missing("TELEGRAM_TOKEN/TELEGRAM_CHAT_ID"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> Result<EnvConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let env = env_from(&[]).unwrap();
        assert_eq!(env.threshold, 7);
        assert_eq!(env.alert_mode, AlertMode::Each);
        assert!(env.telegram.is_none());
        assert!(env.dry_run.is_none());
    }

    #[test]
    fn test_env_values() {
        let env = env_from(&[
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100200"),
            ("THRESHOLD", "9"),
            ("ALERT_MODE", "threshold_only"),
            ("DRY_RUN", "1"),
        ])
        .unwrap();

        assert_eq!(env.threshold, 9);
        assert_eq!(env.alert_mode, AlertMode::ThresholdOnly);
        assert_eq!(env.dry_run, Some(true));
        let creds = env.require_telegram().unwrap();
        assert_eq!(creds.chat_id, "-100200");
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(env_from(&[("THRESHOLD", "seven")]).is_err());
        assert!(env_from(&[("THRESHOLD", "0")]).is_err());
    }

    #[test]
    fn test_unknown_mode_falls_back_to_each() {
        let env = env_from(&[("ALERT_MODE", "SOMETIMES")]).unwrap();
        assert_eq!(env.alert_mode, AlertMode::Each);
    }

    #[test]
    fn test_partial_credentials_are_missing() {
        let env = env_from(&[("TELEGRAM_TOKEN", "123:abc")]).unwrap();
        assert!(env.require_telegram().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [system]
            dry_run = true

            [http]
            max_tries = 2
            "#,
        )
        .unwrap();

        assert!(config.system.dry_run);
        assert_eq!(config.system.state_path, "state.db");
        assert_eq!(config.http.max_tries, 2);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.schedule.interval_secs, 1800);
        assert_eq!(config.sources.liga90_id, "14072");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        let env = env_from(&[("STATE_PATH", "/tmp/x.db"), ("LIGA90_ID", "15000"), ("DRY_RUN", "no")]).unwrap();
        config.system.dry_run = true;
        config.apply_env(&env);

        assert_eq!(config.system.state_path, "/tmp/x.db");
        assert_eq!(config.sources.liga90_id, "15000");
        assert!(!config.system.dry_run);
    }
}
