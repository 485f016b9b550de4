//! Deduplicate concurrent async loads by key.
//!
//! Callers asking for a key that is already loading join the pending load
//! instead of starting another one. The registration happens synchronously
//! inside [`SingleFlightLoader::load_or_join`], before the returned future
//! is first polled, so two callers can never both miss the map.
//!
//! The entry is removed when the load settles, whatever the outcome. A
//! failed load therefore never blocks the next attempt.

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

/// A load that any number of callers can await.
pub type SharedLoad<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

type InFlight<K, V, E> = Mutex<HashMap<K, (u64, SharedLoad<V, E>)>>;

/// Keyed single-flight loader.
///
/// `V` and `E` are cloned out to every joined caller.
pub struct SingleFlightLoader<K, V, E> {
    in_flight: Arc<InFlight<K, V, E>>,
    next_id: AtomicU64,
}

impl<K, V, E> Default for SingleFlightLoader<K, V, E> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<K, V, E> SingleFlightLoader<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the pending load for `key`, or start one with `factory`.
    ///
    /// `factory` runs only when nothing is pending, and runs while the
    /// registry is locked: it must build the future without calling back
    /// into this loader.
    pub fn load_or_join<F, Fut>(&self, key: K, factory: F) -> SharedLoad<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock();
        if let Some((_, pending)) = in_flight.get(&key) {
            trace!(key = ?key, "joining pending load");
            return pending.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry: Weak<InFlight<K, V, E>> = Arc::downgrade(&self.in_flight);
        let entry_key = key.clone();
        let load = factory();

        let shared = async move {
            let result = load.await;
            if let Some(registry) = registry.upgrade() {
                let mut in_flight = registry.lock();
                // A newer load may own the slot if this one was forgotten.
                if matches!(in_flight.get(&entry_key), Some((owner, _)) if *owner == id) {
                    in_flight.remove(&entry_key);
                }
            }
            result
        }
        .boxed()
        .shared();

        trace!(key = ?key, id, "starting load");
        in_flight.insert(key, (id, shared.clone()));
        shared
    }

    /// Whether a load for `key` is pending.
    pub fn is_pending(&self, key: &K) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Detach the pending load for `key`.
    ///
    /// Callers already awaiting it still get its result; the next call
    /// starts a fresh load.
    pub fn forget(&self, key: &K) -> bool {
        self.in_flight.lock().remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counted_load(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        result: Result<u32, String>,
    ) -> impl Future<Output = Result<u32, String>> + Send + 'static {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(delay).await;
            result
        }
    }

    /// N concurrent calls with one key run the factory once.
    #[tokio::test(start_paused = true)]
    async fn test_concurrent_same_key_runs_factory_once() {
        let loader: SingleFlightLoader<&'static str, u32, String> = SingleFlightLoader::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let loads: Vec<_> = (0..5)
            .map(|_| {
                loader.load_or_join("client", || {
                    counted_load(&calls, Duration::from_millis(50), Ok(7))
                })
            })
            .collect();

        let results = futures_util::future::join_all(loads).await;
        assert!(results.iter().all(|r| *r == Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_load_independently() {
        let loader: SingleFlightLoader<u8, u32, String> = SingleFlightLoader::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let a = loader.load_or_join(1, || counted_load(&calls, Duration::from_millis(10), Ok(1)));
        let b = loader.load_or_join(2, || counted_load(&calls, Duration::from_millis(10), Ok(2)));
        assert_eq!(loader.pending_count(), 2);

        assert_eq!(a.await, Ok(1));
        assert_eq!(b.await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// A rejected load does not block a later retry.
    #[tokio::test(start_paused = true)]
    async fn test_failure_allows_retry() {
        let loader: SingleFlightLoader<&'static str, u32, String> = SingleFlightLoader::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = loader.load_or_join("day", || {
            counted_load(&calls, Duration::from_millis(5), Err("boom".into()))
        });
        let joined = loader.load_or_join("day", || {
            counted_load(&calls, Duration::from_millis(5), Ok(0))
        });
        assert_eq!(first.await, Err("boom".to_string()));
        assert_eq!(joined.await, Err("boom".to_string()));
        assert!(!loader.is_pending(&"day"));

        let retry = loader.load_or_join("day", || {
            counted_load(&calls, Duration::from_millis(5), Ok(3))
        });
        assert_eq!(retry.await, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registration_is_synchronous() {
        let loader: SingleFlightLoader<u8, u32, String> = SingleFlightLoader::new();
        let pending = loader.load_or_join(9, || async { Ok(1) });

        // Nothing has been polled yet.
        assert!(loader.is_pending(&9));
        assert_eq!(pending.await, Ok(1));
        assert!(!loader.is_pending(&9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_starts_fresh_load() {
        let loader: SingleFlightLoader<u8, u32, String> = SingleFlightLoader::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let old = loader.load_or_join(1, || counted_load(&calls, Duration::from_millis(20), Ok(1)));
        assert!(loader.forget(&1));
        let new = loader.load_or_join(1, || counted_load(&calls, Duration::from_millis(40), Ok(2)));

        assert_eq!(old.await, Ok(1));
        // The old load must not evict the new one.
        assert!(loader.is_pending(&1));
        assert_eq!(new.await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
