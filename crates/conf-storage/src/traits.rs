//! The config store seam.

use crate::StorageResult;

/// Opaque string key/value store for endpoint, credential and session.
///
/// Calls are synchronous; implementations keep everything in memory and
/// write through on mutation.
pub trait ConfStore: Send + Sync {
    /// `None` when the key was never set or has been deleted.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    fn has(&self, key: &str) -> StorageResult<bool> {
        self.get(key).map(|value| value.is_some())
    }
}
