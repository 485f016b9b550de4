//! vitals-sync - command-line front end for the vitals data-access layer.

mod app;
mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vitals_config_and_utils::{init_logging, Config, Paths};

/// vitals-sync command-line interface.
#[derive(Parser)]
#[command(name = "vitals-sync")]
#[command(about = "Session gate, header cache and coalesced refresh for the vitals client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, config store and logs. Defaults to ~/.vitals
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the REST endpoint and API credential
    Configure {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        credential: String,
    },
    /// Store a session
    Login {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Decide and print the auth state
    Status,
    /// Run one coalesced refresh
    Refresh(RefreshArgs),
}

#[derive(Args, Debug, Default)]
pub struct RefreshArgs {
    #[arg(long)]
    pub doctor: bool,
    #[arg(long)]
    pub lifestyle: bool,
    #[arg(long)]
    pub chart: bool,
    /// Free-form reason recorded with the request
    #[arg(long, default_value = "cli")]
    pub reason: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level, &config.log_format);

    match cli.command {
        Commands::Configure {
            endpoint,
            credential,
        } => commands::configure(&config, &paths, &endpoint, &credential),
        Commands::Login {
            access_token,
            user_id,
        } => commands::login(&config, &paths, &access_token, user_id.as_deref()),
        Commands::Logout => commands::logout(&paths),
        Commands::Status => commands::status(config, paths).await,
        Commands::Refresh(args) => commands::refresh(config, paths, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_flags_parse() {
        let cli = Cli::try_parse_from(["vitals-sync", "refresh", "--chart", "--reason", "opened chart"]).unwrap();
        match cli.command {
            Commands::Refresh(args) => {
                assert!(args.chart && !args.doctor && !args.lifestyle);
                assert_eq!(args.reason, "opened chart");
            }
            _ => panic!("expected refresh"),
        }
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::try_parse_from(["vitals-sync", "status", "--log-level", "debug", "--base-dir", "/tmp/v"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/v")));
    }

    #[test]
    fn test_configure_requires_both_values() {
        assert!(Cli::try_parse_from(["vitals-sync", "configure", "--endpoint", "https://db.example.com"]).is_err());
    }
}
