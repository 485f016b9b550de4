//! The signed-in client's profile, loaded once per session.

use crate::{LoaderError, LoaderResult, RowSource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use single_flight_loader::SingleFlightLoader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub const CLIENT_PROFILE_TABLE: &str = "client_profiles";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Default)]
struct Memo {
    profile: Option<ClientProfile>,
    /// Bumped by `invalidate`; a load started before the bump is not kept.
    generation: u64,
}

/// Memoising, single-flight loader for [`ClientProfile`].
///
/// Concurrent callers share one read. A successful result is kept until
/// [`invalidate`](Self::invalidate); a failure is not.
pub struct ClientBootstrapLoader {
    source: Arc<dyn RowSource>,
    flight: SingleFlightLoader<(), ClientProfile, LoaderError>,
    memo: Arc<Mutex<Memo>>,
    loads: AtomicU64,
}

impl ClientBootstrapLoader {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self {
            source,
            flight: SingleFlightLoader::new(),
            memo: Arc::new(Mutex::new(Memo::default())),
            loads: AtomicU64::new(0),
        }
    }

    pub async fn load(&self) -> LoaderResult<ClientProfile> {
        let generation = {
            let memo = self.memo.lock();
            if let Some(profile) = &memo.profile {
                return Ok(profile.clone());
            }
            memo.generation
        };

        let pending = self.flight.load_or_join((), || {
            self.loads.fetch_add(1, Ordering::Relaxed);
            let source = self.source.clone();
            let memo = self.memo.clone();
            async move {
                let profile = fetch_profile(source.as_ref()).await?;
                let mut memo = memo.lock();
                if memo.generation == generation {
                    memo.profile = Some(profile.clone());
                }
                Ok::<_, LoaderError>(profile)
            }
        });
        pending.await
    }

    /// The memoised profile, without loading.
    pub fn cached(&self) -> Option<ClientProfile> {
        self.memo.lock().profile.clone()
    }

    /// Drop the memoised profile, e.g. after sign-out.
    ///
    /// A load already in flight still resolves for its callers but is not
    /// memoised.
    pub fn invalidate(&self) {
        let mut memo = self.memo.lock();
        memo.profile = None;
        memo.generation += 1;
        self.flight.forget(&());
        debug!(generation = memo.generation, "Client profile invalidated");
    }

    /// Reads started so far.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

async fn fetch_profile(source: &dyn RowSource) -> LoaderResult<ClientProfile> {
    let rows = source
        .fetch_rows(CLIENT_PROFILE_TABLE, "select=id,display_name,timezone&limit=1")
        .await?;
    let row = rows
        .into_iter()
        .next()
        .ok_or(LoaderError::NotFound("client profile"))?;
    let profile: ClientProfile = serde_json::from_value(row).map_err(|e| LoaderError::Decode {
        table: CLIENT_PROFILE_TABLE.to_string(),
        reason: e.to_string(),
    })?;
    info!(client_id = %profile.id, "Client profile loaded");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{unavailable, FakeSource};
    use serde_json::json;
    use std::time::Duration;

    fn source_with_profile() -> Arc<FakeSource> {
        let source = Arc::new(FakeSource::with_delay(Duration::from_millis(5)));
        source.set_rows(
            CLIENT_PROFILE_TABLE,
            vec![json!({"id": "client-1", "display_name": "Ada", "timezone": null})],
        );
        source
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_read() {
        let source = source_with_profile();
        let loader = ClientBootstrapLoader::new(source.clone());

        let (a, b) = tokio::join!(loader.load(), loader.load());
        assert_eq!(a.unwrap().id, "client-1");
        assert_eq!(b.unwrap().display_name.as_deref(), Some("Ada"));
        assert_eq!(source.call_count(CLIENT_PROFILE_TABLE), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_memoised_until_invalidated() {
        let source = source_with_profile();
        let loader = ClientBootstrapLoader::new(source.clone());

        loader.load().await.unwrap();
        loader.load().await.unwrap();
        assert_eq!(loader.load_count(), 1);
        assert!(loader.cached().is_some());

        loader.invalidate();
        assert!(loader.cached().is_none());
        loader.load().await.unwrap();
        assert_eq!(loader.load_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_not_memoised() {
        let source = source_with_profile();
        source.fail(CLIENT_PROFILE_TABLE, unavailable(CLIENT_PROFILE_TABLE));
        let loader = ClientBootstrapLoader::new(source.clone());

        assert!(loader.load().await.is_err());
        source.recover(CLIENT_PROFILE_TABLE);
        assert_eq!(loader.load().await.unwrap().id, "client-1");
        assert_eq!(source.call_count(CLIENT_PROFILE_TABLE), 2);
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let loader = ClientBootstrapLoader::new(Arc::new(FakeSource::new()));
        assert_eq!(
            loader.load().await.unwrap_err(),
            LoaderError::NotFound("client profile")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_in_flight_during_invalidate_is_not_kept() {
        let source = source_with_profile();
        let loader = Arc::new(ClientBootstrapLoader::new(source.clone()));

        let pending = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load().await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        loader.invalidate();

        assert!(pending.await.unwrap().is_ok());
        assert!(loader.cached().is_none());
    }
}
