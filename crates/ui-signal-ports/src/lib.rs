//! Outbound ports from the sync layer to the UI.
//!
//! The core never asks whether a capability exists. It always holds an
//! implementation, and the no-op variants stand in when nothing listens.
//!
//! - [`UiSignals`]: fire-and-forget toggles (login overlay, auth lock,
//!   doctor access)
//! - [`DiagnosticSink`]: observational messages with a severity, never
//!   awaited and never failing

mod diagnostics;
mod signals;

pub use diagnostics::{
    DiagnosticEntry, DiagnosticSink, NullDiagnosticSink, RecordingDiagnosticSink, Severity,
    TracingDiagnosticSink,
};
pub use signals::{NoopUiSignals, RecordingUiSignals, TracingUiSignals, UiSignal, UiSignals};
