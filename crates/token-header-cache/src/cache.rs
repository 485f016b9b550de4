//! TTL cache with single-flight resolution and stale fallback.

use crate::{AuthHeaders, HeaderError};
use auth_gate::claims::forbidden_role;
use auth_gate::SessionProbe;
use conf_storage::ConfManager;
use parking_lot::Mutex;
use single_flight_loader::SingleFlightLoader;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vitals_config_and_utils::{
    Config, DEFAULT_HEADER_MAX_AGE_SECS, DEFAULT_PROBE_TIMEOUT_MS,
};

#[derive(Debug, Clone)]
pub struct HeaderCacheConfig {
    /// Entries younger than this are served without probing.
    pub max_age: Duration,
    pub probe_timeout: Duration,
    /// Credential roles that are never sent.
    pub forbidden_roles: Vec<String>,
}

impl Default for HeaderCacheConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(DEFAULT_HEADER_MAX_AGE_SECS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            forbidden_roles: Config::default().forbidden_roles,
        }
    }
}

impl From<&Config> for HeaderCacheConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_age: config.header_max_age(),
            probe_timeout: config.probe_timeout(),
            forbidden_roles: config.forbidden_roles.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    headers: AuthHeaders,
    cached_at: Instant,
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Produces request headers.
///
/// At most one resolution runs at a time; concurrent callers join it.
pub struct TokenHeaderCache {
    conf: ConfManager,
    probe: Arc<dyn SessionProbe>,
    config: HeaderCacheConfig,
    entry: Slot,
    resolutions: SingleFlightLoader<(), Option<AuthHeaders>, HeaderError>,
}

impl TokenHeaderCache {
    pub fn new(conf: ConfManager, probe: Arc<dyn SessionProbe>, config: HeaderCacheConfig) -> Self {
        Self {
            conf,
            probe,
            config,
            entry: Arc::new(Mutex::new(None)),
            resolutions: SingleFlightLoader::new(),
        }
    }

    /// Current headers, or `None` when there is no session.
    ///
    /// Without `force_refresh` a fresh entry is returned without awaiting
    /// anything. With it the entry is bypassed, but a resolution that is
    /// already running is still joined rather than duplicated.
    pub async fn get_headers(&self, force_refresh: bool) -> Result<Option<AuthHeaders>, HeaderError> {
        if !force_refresh {
            if let Some(headers) = self.fresh() {
                return Ok(Some(headers));
            }
        }

        let conf = self.conf.clone();
        let probe = self.probe.clone();
        let config = self.config.clone();
        let entry = self.entry.clone();
        self.resolutions
            .load_or_join((), move || resolve(conf, probe, config, entry))
            .await
    }

    /// The cached headers if they are younger than the max age.
    pub fn fresh(&self) -> Option<AuthHeaders> {
        let entry = self.entry.lock();
        entry
            .as_ref()
            .filter(|e| e.cached_at.elapsed() < self.config.max_age)
            .map(|e| e.headers.clone())
    }

    /// Whether any entry, fresh or stale, is cached.
    pub fn has_entry(&self) -> bool {
        self.entry.lock().is_some()
    }

    pub fn resolution_pending(&self) -> bool {
        self.resolutions.is_pending(&())
    }

    /// Drop the cached entry.
    pub fn invalidate(&self) {
        if self.entry.lock().take().is_some() {
            debug!("Header cache invalidated");
        }
    }
}

async fn resolve(
    conf: ConfManager,
    probe: Arc<dyn SessionProbe>,
    config: HeaderCacheConfig,
    entry: Slot,
) -> Result<Option<AuthHeaders>, HeaderError> {
    let credential = conf
        .bearer_credential()?
        .ok_or(HeaderError::ConfigMissing("bearer credential"))?;

    if let Some(role) = forbidden_role(&credential, &config.forbidden_roles) {
        entry.lock().take();
        warn!(role = %role, "Stored credential is privileged, refusing to use it");
        return Err(HeaderError::ForbiddenCredential { role });
    }

    let stale = || entry.lock().as_ref().map(|e| e.headers.clone());

    match tokio::time::timeout(config.probe_timeout, probe.probe()).await {
        Err(_) => {
            let fallback = stale();
            warn!(
                timeout_ms = config.probe_timeout.as_millis() as u64,
                has_stale = fallback.is_some(),
                "Session probe timed out, using cached headers"
            );
            Ok(fallback)
        }
        Ok(Err(e)) => {
            let fallback = stale();
            warn!(error = %e, has_stale = fallback.is_some(), "Session probe failed, using cached headers");
            Ok(fallback)
        }
        Ok(Ok(None)) => {
            let previous = entry.lock().take().map(|e| e.headers);
            info!(had_entry = previous.is_some(), "No session, header cache cleared");
            Ok(previous)
        }
        Ok(Ok(Some(session))) => {
            let headers = AuthHeaders::new(credential, session.access_token);
            *entry.lock() = Some(CacheEntry {
                headers: headers.clone(),
                cached_at: Instant::now(),
            });
            debug!("Headers resolved");
            Ok(Some(headers))
        }
    }
}
