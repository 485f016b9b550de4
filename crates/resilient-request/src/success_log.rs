//! Collapses runs of identical successful outcomes in the diagnostic trail.
//!
//! Best-effort only: the counts are for humans reading the trail.

use ui_signal_ports::{DiagnosticSink, Severity};

#[derive(Debug, Default)]
pub struct SuccessLog {
    last: Option<(String, u16)>,
    repeats: u32,
}

impl SuccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a success. Only the first of a run reaches the sink.
    pub fn record(&mut self, tag: &str, status: u16, sink: &dyn DiagnosticSink) {
        if let Some((last_tag, last_status)) = &self.last {
            if last_tag == tag && *last_status == status {
                self.repeats += 1;
                return;
            }
        }
        self.flush(sink);
        sink.add(&format!("{}: HTTP {}", tag, status), Severity::Info);
        self.last = Some((tag.to_string(), status));
    }

    /// Emit the pending repeat count, if any, and end the current run.
    pub fn flush(&mut self, sink: &dyn DiagnosticSink) {
        if let Some((tag, status)) = self.last.take() {
            if self.repeats > 0 {
                sink.add(
                    &format!("{}: HTTP {} (x{} more)", tag, status, self.repeats),
                    Severity::Info,
                );
            }
        }
        self.repeats = 0;
    }

    /// Repeats collapsed into the current run.
    pub fn pending_repeats(&self) -> u32 {
        self.repeats
    }
}
