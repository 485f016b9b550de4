use crate::Surface;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed(String),
    /// Abandoned after the step timeout; a late result is discarded.
    TimedOut,
    Panicked(String),
    /// No step registered for the surface.
    Missing,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub pass: u32,
    pub surface: Surface,
    pub outcome: StepOutcome,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Summary of one drain, delivered to every caller it released.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Passes that ran a non-empty snapshot.
    pub passes: u32,
    pub steps: Vec<StepReport>,
    /// Reasons merged into this drain, sorted and deduplicated per pass.
    pub reasons: Vec<String>,
}

impl DrainReport {
    /// How many times `surface` ran during the drain.
    pub fn runs(&self, surface: Surface) -> usize {
        self.steps.iter().filter(|s| s.surface == surface).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.outcome.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl fmt::Display for DrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "passes: {}", self.passes)?;
        for step in &self.steps {
            let outcome = match &step.outcome {
                StepOutcome::Completed => "ok".to_string(),
                StepOutcome::Failed(e) => format!("failed: {}", e),
                StepOutcome::TimedOut => "timed out".to_string(),
                StepOutcome::Panicked(e) => format!("panicked: {}", e),
                StepOutcome::Missing => "no step registered".to_string(),
            };
            writeln!(
                f,
                "  [{}] {:<9} {} ({}ms)",
                step.pass,
                step.surface,
                outcome,
                step.elapsed.as_millis()
            )?;
        }
        if !self.reasons.is_empty() {
            write!(f, "reasons: {}", self.reasons.join(", "))?;
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(pass: u32, surface: Surface, outcome: StepOutcome) -> StepReport {
        StepReport {
            pass,
            surface,
            outcome,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_runs_and_failures() {
        let report = DrainReport {
            passes: 2,
            steps: vec![
                step(1, Surface::Doctor, StepOutcome::Completed),
                step(1, Surface::Chart, StepOutcome::TimedOut),
                step(2, Surface::Doctor, StepOutcome::Completed),
            ],
            reasons: vec!["save".into()],
        };
        assert_eq!(report.runs(Surface::Doctor), 2);
        assert_eq!(report.runs(Surface::Lifestyle), 0);
        assert_eq!(report.failures().count(), 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_display_lists_steps() {
        let report = DrainReport {
            passes: 1,
            steps: vec![step(1, Surface::Lifestyle, StepOutcome::Failed("boom".into()))],
            reasons: vec![],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("lifestyle"));
        assert!(rendered.contains("failed: boom"));
    }
}
