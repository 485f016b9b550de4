//! Subcommand handlers.

use crate::app::SyncApp;
use crate::RefreshArgs;
use anyhow::{bail, Context};
use auth_gate::{claims, AuthState};
use conf_storage::create_conf_manager;
use refresh_coalescer::{RefreshFlags, Surface};
use std::time::Duration;
use tracing::{info, warn};
use vitals_config_and_utils::{Config, Paths};

/// Extra time allowed on top of the grace period and probe for a decision.
const DECISION_SLACK: Duration = Duration::from_secs(5);

pub fn configure(config: &Config, paths: &Paths, endpoint: &str, credential: &str) -> anyhow::Result<()> {
    url::Url::parse(endpoint).with_context(|| format!("Invalid endpoint: {}", endpoint))?;
    if let Some(role) = claims::forbidden_role(credential, &config.forbidden_roles) {
        bail!("Refusing to store a credential with role {}", role);
    }

    let conf = create_conf_manager(paths)?;
    conf.set_rest_endpoint(endpoint)?;
    conf.set_bearer_credential(credential)?;
    info!(endpoint, "Configuration stored");
    println!("Configured {}", endpoint.trim_end_matches('/'));
    Ok(())
}

pub fn login(config: &Config, paths: &Paths, access_token: &str, user_id: Option<&str>) -> anyhow::Result<()> {
    if let Some(role) = claims::forbidden_role(access_token, &config.forbidden_roles) {
        bail!("Refusing to use a token with role {} as a session", role);
    }
    match claims::decode_claims(access_token) {
        Ok(token) if token.is_expired() => warn!("Access token is already expired"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Access token is not a readable JWT"),
    }

    let conf = create_conf_manager(paths)?;
    conf.set_session(access_token, user_id)?;
    println!("Session stored");
    Ok(())
}

pub fn logout(paths: &Paths) -> anyhow::Result<()> {
    let conf = create_conf_manager(paths)?;
    conf.clear_session()?;
    println!("Signed out");
    Ok(())
}

pub async fn status(config: Config, paths: Paths) -> anyhow::Result<()> {
    let app = SyncApp::build(&config, &paths)?;
    let state = decide(&app, &config).await?;

    let user = app.conf.session_user_id()?.unwrap_or_else(|| "-".into());
    let report = serde_json::json!({
        "state": state,
        "user_id": user,
        "endpoint": app.conf.rest_endpoint()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub async fn refresh(config: Config, paths: Paths, args: RefreshArgs) -> anyhow::Result<()> {
    let app = SyncApp::build(&config, &paths)?;
    if decide(&app, &config).await? != AuthState::Authenticated {
        bail!("Not signed in; run `vitals-sync login` first");
    }

    let report = app
        .coordinator
        .request_refresh(refresh_flags(&args), args.reason)
        .await?;
    app.request.flush_diagnostics();

    println!("{}", report);
    if !report.all_succeeded() {
        bail!("{} step(s) failed", report.failures().count());
    }
    Ok(())
}

/// Run one grace cycle and wait for its decision.
async fn decide(app: &SyncApp, config: &Config) -> anyhow::Result<AuthState> {
    app.gate.schedule_grace();
    let limit = config.grace_period() + config.probe_timeout() + DECISION_SLACK;
    let state = tokio::time::timeout(limit, app.gate.wait_for_decision(None))
        .await
        .context("Timed out waiting for the auth decision")??;
    Ok(state)
}

/// Requested surfaces; none selected means all of them.
fn refresh_flags(args: &RefreshArgs) -> RefreshFlags {
    let mut flags = RefreshFlags::none();
    for (selected, surface) in [
        (args.doctor, Surface::Doctor),
        (args.lifestyle, Surface::Lifestyle),
        (args.chart, Surface::Chart),
    ] {
        if selected {
            flags = flags.with(surface);
        }
    }
    if flags.is_empty() {
        RefreshFlags::all()
    } else {
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_flags_means_all() {
        assert_eq!(refresh_flags(&RefreshArgs::default()), RefreshFlags::all());

        let args = RefreshArgs {
            lifestyle: true,
            ..Default::default()
        };
        assert_eq!(refresh_flags(&args), RefreshFlags::only(Surface::Lifestyle));
    }

    #[test]
    fn test_configure_then_login_then_logout() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        let config = Config::new();

        configure(&config, &paths, "https://db.example.com/", "anon-key").unwrap();
        login(&config, &paths, "session-token", Some("user-1")).unwrap();

        let conf = create_conf_manager(&paths).unwrap();
        assert_eq!(conf.rest_endpoint().unwrap().as_deref(), Some("https://db.example.com"));
        assert_eq!(conf.session_user_id().unwrap().as_deref(), Some("user-1"));

        logout(&paths).unwrap();
        let conf = create_conf_manager(&paths).unwrap();
        assert!(conf.session_access_token().unwrap().is_none());
        assert_eq!(conf.bearer_credential().unwrap().as_deref(), Some("anon-key"));
    }

    #[test]
    fn test_configure_rejects_bad_endpoint() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        assert!(configure(&Config::new(), &paths, "db.example.com", "anon-key").is_err());
    }
}
