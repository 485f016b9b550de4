//! UI toggles driven by auth and refresh outcomes.

use parking_lot::Mutex;

/// A toggle sent to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiSignal {
    LoginOverlay(bool),
    AuthLocked(bool),
    DoctorAccessEnabled(bool),
}

/// Receiver of UI toggles.
///
/// Calls are best-effort. Implementations must not block and must not
/// panic; the caller never learns whether the UI reacted.
pub trait UiSignals: Send + Sync {
    /// Show or hide the login overlay.
    fn open_login_overlay(&self, open: bool);

    /// Dim and disable data surfaces while no session is confirmed.
    fn set_auth_locked(&self, locked: bool);

    fn set_doctor_access_enabled(&self, enabled: bool);
}

/// Discards every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUiSignals;

impl UiSignals for NoopUiSignals {
    fn open_login_overlay(&self, _open: bool) {}

    fn set_auth_locked(&self, _locked: bool) {}

    fn set_doctor_access_enabled(&self, _enabled: bool) {}
}

/// Logs every signal at info level. Used by the headless binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUiSignals;

impl UiSignals for TracingUiSignals {
    fn open_login_overlay(&self, open: bool) {
        tracing::info!(open, "ui: login overlay");
    }

    fn set_auth_locked(&self, locked: bool) {
        tracing::info!(locked, "ui: auth lock");
    }

    fn set_doctor_access_enabled(&self, enabled: bool) {
        tracing::info!(enabled, "ui: doctor access");
    }
}

/// Records every signal for testing.
#[derive(Debug, Default)]
pub struct RecordingUiSignals {
    signals: Mutex<Vec<UiSignal>>,
}

impl RecordingUiSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded signals in emission order.
    pub fn signals(&self) -> Vec<UiSignal> {
        self.signals.lock().clone()
    }

    /// Number of times `signal` was emitted.
    pub fn count(&self, signal: UiSignal) -> usize {
        self.signals.lock().iter().filter(|s| **s == signal).count()
    }

    /// Most recent login overlay toggle, if any.
    pub fn last_login_overlay(&self) -> Option<bool> {
        self.signals.lock().iter().rev().find_map(|s| match s {
            UiSignal::LoginOverlay(open) => Some(*open),
            _ => None,
        })
    }

    pub fn last_auth_locked(&self) -> Option<bool> {
        self.signals.lock().iter().rev().find_map(|s| match s {
            UiSignal::AuthLocked(locked) => Some(*locked),
            _ => None,
        })
    }

    pub fn last_doctor_access(&self) -> Option<bool> {
        self.signals.lock().iter().rev().find_map(|s| match s {
            UiSignal::DoctorAccessEnabled(enabled) => Some(*enabled),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.signals.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.signals.lock().is_empty()
    }
}

impl UiSignals for RecordingUiSignals {
    fn open_login_overlay(&self, open: bool) {
        self.signals.lock().push(UiSignal::LoginOverlay(open));
    }

    fn set_auth_locked(&self, locked: bool) {
        self.signals.lock().push(UiSignal::AuthLocked(locked));
    }

    fn set_doctor_access_enabled(&self, enabled: bool) {
        self.signals.lock().push(UiSignal::DoctorAccessEnabled(enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_signals_keep_order() {
        let signals = RecordingUiSignals::new();
        assert!(signals.is_empty());

        signals.set_auth_locked(true);
        signals.open_login_overlay(true);
        signals.set_auth_locked(false);

        assert_eq!(
            signals.signals(),
            vec![
                UiSignal::AuthLocked(true),
                UiSignal::LoginOverlay(true),
                UiSignal::AuthLocked(false),
            ]
        );
        assert_eq!(signals.last_auth_locked(), Some(false));
        assert_eq!(signals.last_login_overlay(), Some(true));
        assert_eq!(signals.last_doctor_access(), None);
        assert_eq!(signals.count(UiSignal::AuthLocked(true)), 1);

        signals.clear();
        assert!(signals.is_empty());
    }

    #[test]
    fn noop_signals_discard() {
        let signals: &dyn UiSignals = &NoopUiSignals;
        signals.open_login_overlay(true);
        signals.set_doctor_access_enabled(false);
    }
}
