//! Application configuration.

use crate::error::{AppError, AppResult};
use liqtrail_core::{TrailingStopConfig, UserId};
use liqtrail_registry::DispatcherConfig;
use liqtrail_telemetry::DEFAULT_LOG_FILTER;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "LIQTRAIL_CONFIG";

/// Config file used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Logging and metrics output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Print the Prometheus text exposition after a run.
    #[serde(default)]
    pub print_metrics: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            print_metrics: false,
        }
    }
}

/// Per-user trailing stop settings.
///
/// Users without an entry get trailing stops with the global config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStopSettings {
    pub user_id: UserId,

    /// Whether new positions of this user get a trailing stop.
    #[serde(default = "default_trailing_stop_enabled")]
    pub trailing_stop_enabled: bool,

    /// Replaces the global `[trailing_stop]` section for this user.
    #[serde(default)]
    pub trailing_stop: Option<TrailingStopConfig>,
}

fn default_trailing_stop_enabled() -> bool {
    true
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Process-wide trailing stop parameters.
    #[serde(default)]
    pub trailing_stop: TrailingStopConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub users: Vec<UserStopSettings>,
}

impl AppConfig {
    /// Resolve the config path: CLI argument, then `LIQTRAIL_CONFIG`, then
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn user_settings(&self, user: &UserId) -> Option<&UserStopSettings> {
        self.users.iter().find(|u| &u.user_id == user)
    }

    /// Whether new positions of `user` get a trailing stop.
    pub fn trailing_stop_enabled(&self, user: &UserId) -> bool {
        self.user_settings(user)
            .map_or(true, |settings| settings.trailing_stop_enabled)
    }

    /// User-specific trailing stop config, if one is set.
    pub fn trailing_stop_override(&self, user: &UserId) -> Option<&TrailingStopConfig> {
        self.user_settings(user)
            .and_then(|settings| settings.trailing_stop.as_ref())
    }
}
