//! Session probe seam.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// The signed-in user's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_id: None,
            email: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Events delivered by the auth backend's change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Looks up the current session.
///
/// `Ok(None)` means "definitely signed out". Errors mean the answer is not
/// known.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    async fn probe(&self) -> AuthResult<Option<Session>>;
}

/// Probe returning a fixed answer, with an optional delay. Counts calls.
pub struct StaticProbe {
    session: Mutex<Option<Session>>,
    fail: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: Mutex::new(session),
            fail: Mutex::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Probe that always finds `access_token`.
    pub fn signed_in(access_token: &str) -> Self {
        Self::new(Some(Session::new(access_token)))
    }

    pub fn signed_out() -> Self {
        Self::new(None)
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock() = session;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Make every subsequent probe fail with [`AuthError::Timeout`].
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Number of probes started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProbe for StaticProbe {
    async fn probe(&self) -> AuthResult<Option<Session>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock() {
            return Err(AuthError::Timeout);
        }
        Ok(self.session.lock().clone())
    }
}
