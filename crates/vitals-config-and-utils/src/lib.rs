//! Configuration, paths and logging setup shared by the vitals sync crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_ATTEMPT_TIMEOUT_MS, DEFAULT_BACKOFF_BASE_MS, DEFAULT_GRACE_PERIOD_MS,
    DEFAULT_HEADER_MAX_AGE_SECS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROBE_TIMEOUT_MS,
    DEFAULT_STEP_TIMEOUT_MS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
