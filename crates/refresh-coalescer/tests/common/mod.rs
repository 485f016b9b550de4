#![allow(dead_code)]

use parking_lot::Mutex;
use refresh_coalescer::{step_fn, CoalescerConfig, RefreshCoordinator, Surface};
use std::sync::Arc;
use std::time::Duration;
use ui_signal_ports::RecordingDiagnosticSink;

/// Shared log of step runs, in execution order.
#[derive(Clone, Default)]
pub struct RunLog(Arc<Mutex<Vec<Surface>>>);

impl RunLog {
    pub fn runs(&self) -> Vec<Surface> {
        self.0.lock().clone()
    }

    pub fn count(&self, surface: Surface) -> usize {
        self.0.lock().iter().filter(|s| **s == surface).count()
    }
}

pub fn coordinator() -> (RefreshCoordinator, Arc<RecordingDiagnosticSink>) {
    let diagnostics = Arc::new(RecordingDiagnosticSink::new());
    let coordinator = RefreshCoordinator::new(CoalescerConfig::default(), diagnostics.clone());
    (coordinator, diagnostics)
}

/// Register a step for every surface that appends to `log` after `delay`.
pub fn register_recording_steps(coordinator: &RefreshCoordinator, delay: Duration) -> RunLog {
    let log = RunLog::default();
    for surface in Surface::ORDER {
        let log = log.clone();
        coordinator.register_step(
            surface,
            step_fn(move || {
                let log = log.clone();
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    log.0.lock().push(surface);
                    Ok(())
                }
            }),
        );
    }
    log
}
