//! The request loop.

use crate::{RequestError, RequestResult, ResponseLike, SuccessLog};
use parking_lot::Mutex;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use token_header_cache::{AuthHeaders, TokenHeaderCache};
use tracing::{debug, error, warn};
use ui_signal_ports::{DiagnosticSink, Severity, UiSignals};
use vitals_config_and_utils::{
    Config, DEFAULT_ATTEMPT_TIMEOUT_MS, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS,
};

/// Retry tuning shared by every call.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub attempt_timeout: Duration,
    /// Delay unit; attempt `n` waits `n * backoff_base` before the next one.
    pub backoff_base: Duration,
    pub max_attempts: u32,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl From<&Config> for RequestConfig {
    fn from(config: &Config) -> Self {
        Self {
            attempt_timeout: config.attempt_timeout(),
            backoff_base: config.backoff_base(),
            max_attempts: config.max_attempts,
        }
    }
}

impl RequestConfig {
    /// Backoff after the given (1-based) failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Label used in logs and diagnostics.
    pub tag: String,
    /// Refresh headers and retry once on 401/403.
    pub retry_auth: bool,
    /// Overrides [`RequestConfig::max_attempts`].
    pub max_attempts: Option<u32>,
}

impl RequestOptions {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            retry_auth: true,
            max_attempts: None,
        }
    }

    pub fn without_auth_retry(mut self) -> Self {
        self.retry_auth = false;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Executes requests with headers, timeouts, retries and auth recovery.
pub struct ResilientRequest {
    headers: Arc<TokenHeaderCache>,
    signals: Arc<dyn UiSignals>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: RequestConfig,
    success_log: Mutex<SuccessLog>,
}

impl ResilientRequest {
    pub fn new(
        headers: Arc<TokenHeaderCache>,
        signals: Arc<dyn UiSignals>,
        diagnostics: Arc<dyn DiagnosticSink>,
        config: RequestConfig,
    ) -> Self {
        Self {
            headers,
            signals,
            diagnostics,
            config,
            success_log: Mutex::new(SuccessLog::new()),
        }
    }

    pub fn header_cache(&self) -> &Arc<TokenHeaderCache> {
        &self.headers
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Run `build` until it yields a response worth returning.
    ///
    /// Attempts are strictly sequential. A timed-out attempt's future is
    /// dropped, so its late result can never surface. 2xx, non-auth 4xx and
    /// a final 5xx are returned as responses; only auth, config and
    /// exhausted transport failures become errors.
    pub async fn execute<R, F, Fut, E>(&self, options: &RequestOptions, mut build: F) -> RequestResult<R>
    where
        R: ResponseLike,
        F: FnMut(AuthHeaders) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
    {
        let tag = options.tag.as_str();
        let max_attempts = options
            .max_attempts
            .unwrap_or(self.config.max_attempts)
            .max(1);

        let mut headers = match self.load_headers(tag, false).await? {
            Some(headers) => headers,
            None => {
                debug!(tag, "No headers cached, forcing refresh");
                match self.load_headers(tag, true).await? {
                    Some(headers) => headers,
                    None => return Err(self.auth_required(tag, 401)),
                }
            }
        };

        let mut attempt: u32 = 1;
        let mut auth_retried = false;

        loop {
            let failure = match tokio::time::timeout(self.config.attempt_timeout, build(headers.clone())).await {
                Err(_) => format!(
                    "timed out after {}ms",
                    self.config.attempt_timeout.as_millis()
                ),
                Ok(Err(e)) => e.to_string(),
                Ok(Ok(response)) => {
                    let status = response.status();

                    if status == 401 || status == 403 {
                        if options.retry_auth && !auth_retried {
                            auth_retried = true;
                            warn!(tag, status, "Auth rejected, refreshing headers");
                            self.diagnostics.add(
                                &format!("{}: HTTP {}, refreshing session", tag, status),
                                Severity::Warn,
                            );
                            headers = match self.load_headers(tag, true).await? {
                                Some(headers) => headers,
                                None => return Err(self.auth_required(tag, status)),
                            };
                            attempt = 1;
                            continue;
                        }
                        return Err(self.auth_required(tag, status));
                    }

                    if (500..600).contains(&status) && attempt < max_attempts {
                        let delay = self.config.delay_for_attempt(attempt);
                        warn!(tag, status, attempt, delay_ms = delay.as_millis() as u64, "Server error, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    self.record_response(tag, status);
                    return Ok(response);
                }
            };

            if attempt < max_attempts {
                let delay = self.config.delay_for_attempt(attempt);
                warn!(tag, attempt, delay_ms = delay.as_millis() as u64, reason = %failure, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            error!(tag, attempts = attempt, reason = %failure, "Request failed");
            self.diagnostics.add(
                &format!("{}: failed after {} attempt(s): {}", tag, attempt, failure),
                Severity::Error,
            );
            return Err(RequestError::NetworkTransient {
                attempts: attempt,
                reason: failure,
            });
        }
    }

    /// Write out any collapsed success count.
    pub fn flush_diagnostics(&self) {
        self.success_log.lock().flush(self.diagnostics.as_ref());
    }

    async fn load_headers(&self, tag: &str, force: bool) -> RequestResult<Option<AuthHeaders>> {
        match self.headers.get_headers(force).await {
            Ok(headers) => Ok(headers),
            Err(e) => {
                let err = RequestError::from(e);
                if err.requires_login() {
                    self.raise_login(tag, &err);
                } else {
                    self.diagnostics
                        .add(&format!("{}: {}", tag, err), Severity::Error);
                }
                Err(err)
            }
        }
    }

    fn auth_required(&self, tag: &str, status: u16) -> RequestError {
        let err = RequestError::AuthRequired { status };
        self.raise_login(tag, &err);
        err
    }

    fn raise_login(&self, tag: &str, err: &RequestError) {
        warn!(tag, error = %err, "Login required");
        self.success_log.lock().flush(self.diagnostics.as_ref());
        self.diagnostics
            .add(&format!("{}: {}", tag, err), Severity::Error);
        self.signals.open_login_overlay(true);
        self.signals.set_auth_locked(true);
    }

    fn record_response(&self, tag: &str, status: u16) {
        let mut log = self.success_log.lock();
        if (200..300).contains(&status) {
            debug!(tag, status, "Request succeeded");
            log.record(tag, status, self.diagnostics.as_ref());
        } else {
            warn!(tag, status, "Request returned error status");
            log.flush(self.diagnostics.as_ref());
            self.diagnostics
                .add(&format!("{}: HTTP {}", tag, status), Severity::Warn);
        }
    }
}
