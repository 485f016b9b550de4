//! The auth gate: grace-period probing, decisions and waiters.

use crate::{
    AuthError, AuthEvent, AuthResult, AuthState, GateMachine, GateMachineInput, Session,
    SessionProbe,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ui_signal_ports::UiSignals;
use vitals_config_and_utils::{Config, DEFAULT_GRACE_PERIOD_MS};

/// Gate tuning.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// How long to hold `Unknown` before probing.
    pub grace_period: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        }
    }
}

impl From<&Config> for GateConfig {
    fn from(config: &Config) -> Self {
        Self {
            grace_period: config.grace_period(),
        }
    }
}

type SignOutCleanup = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// What a decision rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    SignedIn,
    SignedOut,
    /// The probe failed. Decides signed out but leaves local state alone.
    Unverified,
}

impl Verdict {
    fn from_logged_in(logged_in: bool) -> Self {
        if logged_in {
            Verdict::SignedIn
        } else {
            Verdict::SignedOut
        }
    }
}

struct GateInner {
    fsm: GateMachine,
    waiters: Vec<(u64, oneshot::Sender<AuthState>)>,
    next_waiter_id: u64,
    /// Pending grace timer, tagged with the cycle that started it.
    grace: Option<(u64, JoinHandle<()>)>,
    grace_cycle: u64,
    /// Sign-out cleanup already ran for the current `Unauthenticated` spell.
    cleaned_up: bool,
}

struct Shared {
    inner: Mutex<GateInner>,
    probe: Arc<dyn SessionProbe>,
    signals: Arc<dyn UiSignals>,
    config: GateConfig,
    sign_out_cleanup: Mutex<Option<SignOutCleanup>>,
    state_tx: watch::Sender<AuthState>,
}

/// Tri-state auth store.
///
/// Starts in [`AuthState::Unknown`]. A decision is reached either by a grace
/// cycle ([`AuthGate::schedule_grace`]) that probes the session, or directly
/// through [`AuthGate::finalize`] and [`AuthGate::handle_auth_event`].
///
/// Cloning is cheap and every clone drives the same gate. Methods that start
/// timers or cleanup tasks must run inside a Tokio runtime.
#[derive(Clone)]
pub struct AuthGate {
    shared: Arc<Shared>,
}

impl AuthGate {
    pub fn new(
        probe: Arc<dyn SessionProbe>,
        signals: Arc<dyn UiSignals>,
        config: GateConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Unknown);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(GateInner {
                    fsm: GateMachine::new(),
                    waiters: Vec::new(),
                    next_waiter_id: 0,
                    grace: None,
                    grace_cycle: 0,
                    cleaned_up: false,
                }),
                probe,
                signals,
                config,
                sign_out_cleanup: Mutex::new(None),
                state_tx,
            }),
        }
    }

    /// The session probe this gate decides with.
    pub fn probe(&self) -> &Arc<dyn SessionProbe> {
        &self.shared.probe
    }

    pub fn state(&self) -> AuthState {
        AuthState::from(self.shared.inner.lock().fsm.state())
    }

    /// Receiver that observes every state published by the gate.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.shared.state_tx.subscribe()
    }

    /// Whether a grace timer is currently pending.
    pub fn grace_pending(&self) -> bool {
        self.shared.inner.lock().grace.is_some()
    }

    /// Number of callers currently blocked in [`AuthGate::wait_for_decision`].
    pub fn waiter_count(&self) -> usize {
        self.shared.inner.lock().waiters.len()
    }

    /// Register the callback run after a confirmed sign-out.
    ///
    /// Runs once per spell in `Unauthenticated`, and only when the decision
    /// came from `finalize(false)`, an auth event or a probe that found no
    /// session. A failed probe never triggers it. Replaces any previously
    /// registered callback.
    pub fn on_sign_out<F, Fut>(&self, cleanup: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cleanup: SignOutCleanup = Arc::new(move || cleanup().boxed());
        *self.shared.sign_out_cleanup.lock() = Some(cleanup);
    }

    /// Start a new grace cycle.
    ///
    /// Cancels any pending timer, forces the state to `Unknown` and probes
    /// the session once the grace period has elapsed.
    pub fn schedule_grace(&self) {
        let mut inner = self.shared.inner.lock();
        if let Some((cycle, handle)) = inner.grace.take() {
            debug!(cycle, "Cancelling pending grace timer");
            handle.abort();
        }
        self.transition(&mut inner, &GateMachineInput::GraceStarted);

        inner.grace_cycle += 1;
        let cycle = inner.grace_cycle;
        let gate = self.clone();
        let grace_period = self.shared.config.grace_period;

        // The lock is held until the handle is stored, so the timer can never
        // observe an empty slot for its own cycle.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            let verdict = match gate.shared.probe.probe().await {
                Ok(session) => Verdict::from_logged_in(session.is_some()),
                Err(e) => {
                    warn!(error = %e, "Session probe failed, locking without clearing the session");
                    Verdict::Unverified
                }
            };
            gate.decide(verdict, Some(cycle));
        });
        inner.grace = Some((cycle, handle));
        drop(inner);

        debug!(cycle, grace_ms = grace_period.as_millis() as u64, "Grace cycle started");
        self.shared.state_tx.send_replace(AuthState::Unknown);
    }

    /// Record a decision.
    ///
    /// Cancels the grace timer, releases every waiter with the new state and
    /// locks or unlocks the UI. Calling it again with the same value only
    /// reconfirms the state.
    pub fn finalize(&self, logged_in: bool) -> AuthState {
        self.decide(Verdict::from_logged_in(logged_in), None)
    }

    /// Feed an event from the auth backend's change subscription.
    pub fn handle_auth_event(&self, event: AuthEvent, session: Option<Session>) {
        debug!(event = ?event, has_session = session.is_some(), "Auth event");
        match event {
            AuthEvent::SignedIn | AuthEvent::TokenRefreshed | AuthEvent::UserUpdated => {
                self.finalize(session.is_some());
            }
            AuthEvent::SignedOut => {
                self.finalize(false);
            }
            AuthEvent::InitialSession => {
                if session.is_some() {
                    self.finalize(true);
                } else {
                    // The backend may still be restoring the session.
                    self.schedule_grace();
                }
            }
        }
    }

    /// Wait until the state is known.
    ///
    /// Returns immediately when a decision already exists. Otherwise resolves
    /// at the next decision. Firing or dropping the sender of `abort` removes
    /// the waiter and returns [`AuthError::Aborted`].
    pub async fn wait_for_decision(
        &self,
        abort: Option<oneshot::Receiver<()>>,
    ) -> AuthResult<AuthState> {
        let (id, decision) = {
            let mut inner = self.shared.inner.lock();
            let state = AuthState::from(inner.fsm.state());
            if state.is_known() {
                return Ok(state);
            }
            let id = inner.next_waiter_id;
            inner.next_waiter_id += 1;
            let (tx, rx) = oneshot::channel();
            inner.waiters.push((id, tx));
            (id, rx)
        };

        match abort {
            None => decision.await.map_err(|_| AuthError::Aborted),
            Some(abort) => {
                tokio::select! {
                    biased;
                    state = decision => state.map_err(|_| AuthError::Aborted),
                    _ = abort => {
                        self.shared.inner.lock().waiters.retain(|(w, _)| *w != id);
                        debug!(waiter = id, "Decision wait aborted");
                        Err(AuthError::Aborted)
                    }
                }
            }
        }
    }

    fn decide(&self, verdict: Verdict, from_cycle: Option<u64>) -> AuthState {
        let mut inner = self.shared.inner.lock();

        match from_cycle {
            Some(cycle) => {
                let pending = inner.grace.as_ref().map(|(pending, _)| *pending);
                if pending != Some(cycle) {
                    debug!(cycle, "Ignoring result of a superseded grace cycle");
                    return AuthState::from(inner.fsm.state());
                }
                inner.grace = None;
            }
            None => {
                if let Some((_, handle)) = inner.grace.take() {
                    handle.abort();
                }
            }
        }

        let logged_in = verdict == Verdict::SignedIn;
        let previous = AuthState::from(inner.fsm.state());
        let input = if logged_in {
            GateMachineInput::SessionConfirmed
        } else {
            GateMachineInput::SessionMissing
        };
        let state = self.transition(&mut inner, &input);
        let run_cleanup = state == AuthState::Unauthenticated
            && verdict == Verdict::SignedOut
            && !inner.cleaned_up;
        if run_cleanup {
            inner.cleaned_up = true;
        }
        let waiters = std::mem::take(&mut inner.waiters);
        drop(inner);

        for (_, waiter) in waiters {
            let _ = waiter.send(state);
        }
        self.shared.state_tx.send_replace(state);
        self.shared.signals.set_auth_locked(!logged_in);

        if previous != state {
            info!(from = %previous, to = %state, "Auth decision");
        }
        if run_cleanup {
            self.spawn_sign_out_cleanup();
        }
        state
    }

    fn transition(&self, inner: &mut GateInner, input: &GateMachineInput) -> AuthState {
        let result = inner.fsm.consume(input);
        let state = AuthState::from(inner.fsm.state());
        if state != AuthState::Unauthenticated {
            inner.cleaned_up = false;
        }
        if let Err(e) = result {
            // gate_machine accepts every input in every state.
            let err = AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}: {:?}",
                input,
                inner.fsm.state(),
                e
            ));
            warn!(error = %err, "Auth transition rejected");
        }
        state
    }

    fn spawn_sign_out_cleanup(&self) {
        let cleanup = self.shared.sign_out_cleanup.lock().clone();
        if let Some(cleanup) = cleanup {
            debug!("Scheduling sign-out cleanup");
            tokio::spawn(cleanup());
        }
    }
}
