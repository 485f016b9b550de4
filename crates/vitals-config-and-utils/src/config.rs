//! Runtime configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// How long the auth gate holds `Unknown` before probing the session.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 400;
/// Age after which cached request headers are re-resolved.
pub const DEFAULT_HEADER_MAX_AGE_SECS: u64 = 300;
/// Bound on a single session probe made while resolving headers.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;
/// Bound on a single request attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 10_000;
/// Linear backoff unit between request attempts.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 200;
/// Attempts per logical request, not counting the auth retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
/// Bound on a single refresh step.
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 8_000;

fn default_forbidden_roles() -> Vec<String> {
    vec!["service_role".to_string(), "supabase_admin".to_string()]
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

fn default_header_max_age_secs() -> u64 {
    DEFAULT_HEADER_MAX_AGE_SECS
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}

fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_step_timeout_ms() -> u64 {
    DEFAULT_STEP_TIMEOUT_MS
}

/// Main configuration, stored as JSON at [`Paths::config_file`].
///
/// Every field has a serde default so partial files load cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Stderr log format ("compact" or "json").
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_header_max_age_secs")]
    pub header_max_age_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    /// JWT `role` claims that must never be sent as the API credential.
    #[serde(default = "default_forbidden_roles")]
    pub forbidden_roles: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            header_max_age_secs: DEFAULT_HEADER_MAX_AGE_SECS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            step_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            forbidden_roles: default_forbidden_roles(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Only logging can be overridden from the environment.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("VITALS_LOG_LEVEL") {
            if !log_level.trim().is_empty() {
                self.log_level = log_level.trim().to_string();
            }
        }
        if let Ok(log_format) = std::env::var("VITALS_LOG_FORMAT") {
            if !log_format.trim().is_empty() {
                self.log_format = log_format.trim().to_string();
            }
        }
    }

    /// Reject values that would disable a bound entirely.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::Config("max_attempts must be at least 1".into()));
        }
        for (name, value) in [
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("attempt_timeout_ms", self.attempt_timeout_ms),
            ("step_timeout_ms", self.step_timeout_ms),
        ] {
            if value == 0 {
                return Err(CoreError::Config(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn header_max_age(&self) -> Duration {
        Duration::from_secs(self.header_max_age_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}
