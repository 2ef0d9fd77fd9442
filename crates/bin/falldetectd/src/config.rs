//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `falldetect.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use falldetect_adapter_ble::BleConfig;
use falldetect_adapter_virtual::VirtualConfig;
use falldetect_app::pipeline::PipelineConfig;
use falldetect_app::pipeline::dispatcher::DEFAULT_SUPPRESSION_WINDOW;
use falldetect_domain::account::UserId;
use falldetect_domain::error::ValidationError;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Peripheral and btleplug settings.
    pub ble: BleConfig,
    /// Pipeline tuning.
    pub pipeline: PipelineSettings,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Account the daemon records falls for.
    pub account: AccountConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Which transport to run.
    pub transport: TransportConfig,
    /// Simulated sensor, used when `transport.kind = "virtual"`.
    #[serde(rename = "virtual")]
    pub virtual_sensor: VirtualConfig,
}

/// Pipeline tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Duplicate suppression window, in milliseconds.
    pub debounce_ms: u64,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Monitored account and its caregiver.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Account falls are recorded for.
    pub user_id: String,
    /// Caregiver account to link at startup, if any.
    pub linked_user_id: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Transport selection.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `ble` or `virtual`.
    pub kind: String,
}

/// Transport the daemon runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The host's BLE adapter via btleplug.
    Ble,
    /// The in-process simulated sensor.
    Virtual,
}

impl Config {
    /// Load configuration from `falldetect.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("falldetect.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FALLDETECT_TARGET_NAME") {
            self.ble.target_name = val;
        }
        if let Ok(val) = std::env::var("FALLDETECT_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("FALLDETECT_USER") {
            self.account.user_id = val;
        }
        if let Ok(val) = std::env::var("FALLDETECT_LINKED_USER") {
            self.account.linked_user_id = Some(val);
        }
        if let Ok(val) = std::env::var("FALLDETECT_TRANSPORT") {
            self.transport.kind = val;
        }
        if let Ok(val) = std::env::var("FALLDETECT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ble.target_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                ValidationError::EmptyTargetName.to_string(),
            ));
        }
        let owner = self.owner()?;
        if let Some(linked) = &self.account.linked_user_id {
            let linked = UserId::new(linked.as_str())
                .map_err(|err| ConfigError::Validation(format!("linked user id: {err}")))?;
            if linked == owner {
                return Err(ConfigError::Validation(
                    "linked user id must differ from user id".to_string(),
                ));
            }
        }
        self.transport_kind()?;
        Ok(())
    }

    /// The monitored account.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the user id is blank.
    pub fn owner(&self) -> Result<UserId, ConfigError> {
        UserId::new(self.account.user_id.as_str())
            .map_err(|err| ConfigError::Validation(format!("user id: {err}")))
    }

    /// The selected transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown transport name.
    pub fn transport_kind(&self) -> Result<TransportKind, ConfigError> {
        match self.transport.kind.trim().to_ascii_lowercase().as_str() {
            "ble" => Ok(TransportKind::Ble),
            "virtual" => Ok(TransportKind::Virtual),
            other => Err(ConfigError::Validation(format!(
                "unknown transport {other:?}, expected \"ble\" or \"virtual\""
            ))),
        }
    }

    /// Settings for the pipeline actor.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            target_name: self.ble.target_name.trim().to_string(),
            profile: self.ble.profile,
            suppression_window: Duration::from_millis(self.pipeline.debounce_ms),
        }
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            debounce_ms: u64::try_from(DEFAULT_SUPPRESSION_WINDOW.as_millis()).unwrap_or(5_000),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:falldetect.db?mode=rwc".to_string(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            linked_user_id: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "falldetectd=info,falldetect=info,btleplug=warn".to_string(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: "ble".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
