//! Logging initialization.
//!
//! Thin wrapper over the observability package so binaries pick the service
//! name and format from one place.

use observability::{LogConfig, LogFormat};

/// Initialize tracing for the sync binary.
///
/// `RUST_LOG` still wins over `level` when set.
///
/// ```ignore
/// init_logging("info", "compact");
/// tracing::info!("sync started");
/// ```
pub fn init_logging(level: &str, format: &str) {
    observability::init_with_config(LogConfig {
        service_name: "vitals-sync".into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        format: LogFormat::parse(format),
        ..Default::default()
    });
}

/// Level for a config or CLI string; anything unrecognised is `INFO`.
pub fn parse_level(level: &str) -> tracing::Level {
    let level = level.trim();
    if level.eq_ignore_ascii_case("warning") {
        return tracing::Level::WARN;
    }
    level.parse().unwrap_or(tracing::Level::INFO)
}
