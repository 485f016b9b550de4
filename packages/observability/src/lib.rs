//! # Observability
//!
//! Shared tracing setup for every binary in the vitals sync workspace.
//!
//! Library crates never configure logging. They emit events through the
//! `tracing` macros and the binary calls [`init`] or [`init_with_config`]
//! exactly once at startup.
//!
//! Two output shapes are supported on stderr:
//!
//! - [`LogFormat::Compact`]: human readable single lines (default).
//! - [`LogFormat::Json`]: one JSON object per event, same schema as the dev
//!   file written by the `dev` feature.
//!
//! With the `dev` feature enabled every event is also appended to
//! `~/.vitals/logs/dev.jsonl`, so `tail -f ~/.vitals/logs/dev.jsonl | jq`
//! follows a running process.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "vitals-sync".into(),
//!         default_level: "debug".into(),
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

#[cfg(feature = "dev")]
mod dev;

mod json_layer;

pub use json_layer::{JsonLayer, LogEntry};

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output shape for stderr logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human readable lines.
    #[default]
    Compact,
    /// JSON lines (see [`LogEntry`]).
    Json,
}

impl LogFormat {
    /// Parse a format name, falling back to compact for anything unknown.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the process (e.g., "vitals-sync").
    /// Included in every JSON log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Stderr output shape.
    pub format: LogFormat,

    /// Optional custom dev log file path (`dev` feature only).
    /// Defaults to `~/.vitals/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
            log_path: None,
        }
    }
}

/// Initialize logging with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Calling this twice is harmless: the second global subscriber install
/// fails and is ignored.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
    }

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;
        use tracing_subscriber::Layer;

        let filter = env_filter(&config.default_level);
        let stderr_layer = match config.format {
            LogFormat::Compact => tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact()
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Json => {
                JsonLayer::new(config.service_name.clone(), std::io::stderr).boxed()
            }
        };

        let _ = tracing_subscriber::registry()
            .with(stderr_layer.with_filter(filter))
            .try_init();
    }
}

/// Build the env filter from `RUST_LOG`, falling back to `default_level`.
pub(crate) fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSONL "), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Compact);
    }
}
