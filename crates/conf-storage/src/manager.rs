//! Typed access to the config store.

use crate::{ConfKeys, ConfStore, StorageError, StorageResult};
use std::sync::Arc;

/// High-level API over a [`ConfStore`].
///
/// Cheap to clone; every clone shares the same backend.
#[derive(Clone)]
pub struct ConfManager {
    store: Arc<dyn ConfStore>,
}

impl ConfManager {
    pub fn new(store: Arc<dyn ConfStore>) -> Self {
        Self { store }
    }

    /// Direct access to the backend.
    pub fn store(&self) -> &Arc<dyn ConfStore> {
        &self.store
    }

    // ==========================================
    // Endpoint and credential
    // ==========================================

    pub fn rest_endpoint(&self) -> StorageResult<Option<String>> {
        Ok(non_empty(self.store.get(ConfKeys::REST_ENDPOINT)?))
    }

    /// Store the REST endpoint, trimmed and without trailing slashes.
    pub fn set_rest_endpoint(&self, endpoint: &str) -> StorageResult<()> {
        let normalized = endpoint.trim().trim_end_matches('/');
        if normalized.is_empty() {
            return Err(StorageError::InvalidValue {
                key: ConfKeys::REST_ENDPOINT.to_string(),
                reason: "endpoint is empty".to_string(),
            });
        }
        self.store.set(ConfKeys::REST_ENDPOINT, normalized)
    }

    pub fn bearer_credential(&self) -> StorageResult<Option<String>> {
        Ok(non_empty(self.store.get(ConfKeys::BEARER_CREDENTIAL)?))
    }

    pub fn set_bearer_credential(&self, credential: &str) -> StorageResult<()> {
        self.store
            .set(ConfKeys::BEARER_CREDENTIAL, credential.trim())
    }

    // ==========================================
    // Session
    // ==========================================

    pub fn session_access_token(&self) -> StorageResult<Option<String>> {
        Ok(non_empty(self.store.get(ConfKeys::SESSION_ACCESS_TOKEN)?))
    }

    pub fn session_user_id(&self) -> StorageResult<Option<String>> {
        Ok(non_empty(self.store.get(ConfKeys::SESSION_USER_ID)?))
    }

    /// Store a session. A `None` user id removes any previous one.
    pub fn set_session(&self, access_token: &str, user_id: Option<&str>) -> StorageResult<()> {
        self.store
            .set(ConfKeys::SESSION_ACCESS_TOKEN, access_token.trim())?;
        match user_id {
            Some(id) => self.store.set(ConfKeys::SESSION_USER_ID, id)?,
            None => {
                self.store.delete(ConfKeys::SESSION_USER_ID)?;
            }
        }
        tracing::debug!("stored session");
        Ok(())
    }

    pub fn clear_session(&self) -> StorageResult<()> {
        self.store.delete(ConfKeys::SESSION_ACCESS_TOKEN)?;
        self.store.delete(ConfKeys::SESSION_USER_ID)?;
        tracing::debug!("cleared session");
        Ok(())
    }

    /// Remove every key this manager knows about.
    pub fn clear_all(&self) -> StorageResult<()> {
        self.clear_session()?;
        self.store.delete(ConfKeys::REST_ENDPOINT)?;
        self.store.delete(ConfKeys::BEARER_CREDENTIAL)?;
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
