//! The drain loop.

use crate::{DrainReport, RefreshError, RefreshFlags, RefreshStep, StepOutcome, StepReport, Surface};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use ui_signal_ports::{DiagnosticSink, Severity};
use vitals_config_and_utils::{Config, DEFAULT_STEP_TIMEOUT_MS};

#[derive(Debug, Clone)]
pub struct CoalescerConfig {
    /// Bound on each step. A slower step is abandoned, not cancelled.
    pub step_timeout: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
        }
    }
}

impl From<&Config> for CoalescerConfig {
    fn from(config: &Config) -> Self {
        Self {
            step_timeout: config.step_timeout(),
        }
    }
}

#[derive(Default)]
struct NeedSet {
    needed: RefreshFlags,
    reasons: BTreeSet<String>,
    waiters: Vec<oneshot::Sender<DrainReport>>,
    /// A drain task is scheduled or running.
    running: bool,
}

enum Next {
    Run(RefreshFlags, Vec<String>),
    Done(Vec<oneshot::Sender<DrainReport>>),
}

struct Shared {
    need: Mutex<NeedSet>,
    steps: Mutex<HashMap<Surface, Arc<dyn RefreshStep>>>,
    config: CoalescerConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
}

/// Resolves when the drain that serviced a request has finished.
#[must_use = "a ticket does nothing unless awaited; drop it to fire and forget"]
pub struct RefreshTicket(oneshot::Receiver<DrainReport>);

impl Future for RefreshTicket {
    type Output = Result<DrainReport, RefreshError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|r| r.map_err(|_| RefreshError::CoordinatorGone))
    }
}

/// Merges refresh requests and runs them in one draining task at a time.
///
/// Cloning is cheap; clones share the need set and steps. Requests must be
/// made from inside a Tokio runtime.
#[derive(Clone)]
pub struct RefreshCoordinator {
    shared: Arc<Shared>,
}

impl RefreshCoordinator {
    pub fn new(config: CoalescerConfig, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                need: Mutex::new(NeedSet::default()),
                steps: Mutex::new(HashMap::new()),
                config,
                diagnostics,
            }),
        }
    }

    /// Install the step for `surface`, replacing any previous one.
    pub fn register_step(&self, surface: Surface, step: Arc<dyn RefreshStep>) {
        self.shared.steps.lock().insert(surface, step);
    }

    /// Ask for `flags` to be refreshed.
    ///
    /// The flags are merged before this returns. A drain is spawned unless
    /// one is already scheduled or running; on a current-thread runtime it
    /// starts at the caller's next yield, so requests made in the same tick
    /// share one pass.
    pub fn request_refresh(&self, flags: RefreshFlags, reason: impl Into<String>) -> RefreshTicket {
        let reason = reason.into();
        let (tx, rx) = oneshot::channel();

        let mut need = self.shared.need.lock();
        need.needed.merge(flags);
        if !reason.is_empty() {
            need.reasons.insert(reason.clone());
        }
        need.waiters.push(tx);

        let spawn = !need.running;
        need.running = true;
        debug!(
            ?flags,
            reason = %reason,
            waiters = need.waiters.len(),
            spawn,
            "Refresh requested"
        );
        drop(need);

        if spawn {
            let shared = self.shared.clone();
            tokio::spawn(drain(shared));
        }
        RefreshTicket(rx)
    }

    /// Whether a drain is scheduled or running.
    pub fn is_running(&self) -> bool {
        self.shared.need.lock().running
    }

    /// Flags merged since the current pass took its snapshot.
    pub fn pending(&self) -> RefreshFlags {
        self.shared.need.lock().needed
    }
}

/// Clears `running` if the drain future is dropped before it finishes, as
/// on runtime shutdown. Waiters still queued see `CoordinatorGone`; merged
/// flags stay for the next drain.
struct DrainGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut need = self.shared.need.lock();
        need.running = false;
        let dropped = std::mem::take(&mut need.waiters).len();
        drop(need);
        warn!(waiters = dropped, "Drain aborted before finishing");
    }
}

async fn drain(shared: Arc<Shared>) {
    let mut guard = DrainGuard {
        shared: shared.clone(),
        armed: true,
    };
    let mut report = DrainReport::default();

    // Exiting, clearing `running` and collecting the waiters happen under
    // one lock, so a request can never land between them unserved.
    let waiters = loop {
        match take_next(&shared) {
            Next::Run(snapshot, reasons) => {
                report.passes += 1;
                let pass = report.passes;
                info!(pass, ?snapshot, reasons = ?reasons, "Refresh pass started");
                report.reasons.extend(reasons);

                for surface in snapshot.surfaces() {
                    let step_report = run_step(&shared, pass, surface).await;
                    report.steps.push(step_report);
                }
            }
            Next::Done(waiters) => break waiters,
        }
    };
    guard.armed = false;

    debug!(
        passes = report.passes,
        steps = report.steps.len(),
        waiters = waiters.len(),
        "Drain finished"
    );
    for waiter in waiters {
        let _ = waiter.send(report.clone());
    }
}

fn take_next(shared: &Shared) -> Next {
    let mut need = shared.need.lock();
    if need.needed.is_empty() {
        need.running = false;
        need.reasons.clear();
        return Next::Done(std::mem::take(&mut need.waiters));
    }
    let snapshot = std::mem::take(&mut need.needed);
    let reasons = std::mem::take(&mut need.reasons).into_iter().collect();
    Next::Run(snapshot, reasons)
}

async fn run_step(shared: &Shared, pass: u32, surface: Surface) -> StepReport {
    let started = Instant::now();
    let step = shared.steps.lock().get(&surface).cloned();

    let outcome = match step {
        None => StepOutcome::Missing,
        Some(step) => {
            // Own task: a panic is contained and a timed-out step keeps
            // running detached, with its result dropped.
            let handle = tokio::spawn(async move { step.run().await });
            match tokio::time::timeout(shared.config.step_timeout, handle).await {
                Err(_) => StepOutcome::TimedOut,
                Ok(Err(join_err)) if join_err.is_panic() => {
                    StepOutcome::Panicked(panic_message(join_err.into_panic()))
                }
                Ok(Err(join_err)) => StepOutcome::Failed(join_err.to_string()),
                Ok(Ok(Err(e))) => StepOutcome::Failed(format!("{:#}", e)),
                Ok(Ok(Ok(()))) => StepOutcome::Completed,
            }
        }
    };
    let elapsed = started.elapsed();

    match &outcome {
        StepOutcome::Completed => {
            debug!(pass, surface = %surface, elapsed_ms = elapsed.as_millis() as u64, "Step completed");
        }
        StepOutcome::Missing => {
            warn!(pass, surface = %surface, "No step registered, skipping");
            shared
                .diagnostics
                .add(&format!("refresh {}: no step registered", surface), Severity::Warn);
        }
        StepOutcome::TimedOut => {
            warn!(
                pass,
                surface = %surface,
                timeout_ms = shared.config.step_timeout.as_millis() as u64,
                "Step timed out, abandoning it"
            );
            shared
                .diagnostics
                .add(&format!("refresh {}: timed out", surface), Severity::Warn);
        }
        StepOutcome::Failed(e) | StepOutcome::Panicked(e) => {
            warn!(pass, surface = %surface, error = %e, "Step failed");
            shared
                .diagnostics
                .add(&format!("refresh {}: {}", surface, e), Severity::Error);
        }
    }

    StepReport {
        pass,
        surface,
        outcome,
        elapsed,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
