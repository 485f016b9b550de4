//! Refresh steps for the three surfaces.
//!
//! Each step reads through the loaders and stores what it got in
//! [`SurfaceSnapshots`]. A failed step marks its surface stale and returns
//! the error for the coordinator to record.

use crate::{ClientBootstrapLoader, DayDataLoader, LoaderResult, RowSource, SurfaceSnapshots};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use refresh_coalescer::{RefreshCoordinator, RefreshStep, Surface};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};
use ui_signal_ports::UiSignals;

pub const DOCTOR_ACCESS_TABLE: &str = "doctor_access";
pub const LIFESTYLE_TABLE: &str = "lifestyle_entries";
pub const MEASUREMENTS_TABLE: &str = "measurements";

/// Days shown on the chart, today included.
pub const CHART_DAYS: u32 = 7;

/// Source of "today" for the per-day surfaces.
pub type Today = fn() -> NaiveDate;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

async fn store_outcome<F>(snapshots: &SurfaceSnapshots, surface: Surface, load: F) -> anyhow::Result<()>
where
    F: Future<Output = LoaderResult<Value>>,
{
    match load.await {
        Ok(data) => {
            snapshots.store(surface, data);
            Ok(())
        }
        Err(e) => {
            snapshots.mark_failed(surface, &e.to_string());
            Err(e.into())
        }
    }
}

/// Reads the client's doctor grants and drives the doctor-access toggle.
pub struct DoctorAccessStep {
    bootstrap: Arc<ClientBootstrapLoader>,
    source: Arc<dyn RowSource>,
    signals: Arc<dyn UiSignals>,
    snapshots: Arc<SurfaceSnapshots>,
}

impl DoctorAccessStep {
    pub fn new(
        bootstrap: Arc<ClientBootstrapLoader>,
        source: Arc<dyn RowSource>,
        signals: Arc<dyn UiSignals>,
        snapshots: Arc<SurfaceSnapshots>,
    ) -> Self {
        Self {
            bootstrap,
            source,
            signals,
            snapshots,
        }
    }

    async fn load(&self) -> LoaderResult<Value> {
        let profile = self.bootstrap.load().await?;
        let query = format!("client_id=eq.{}&select=doctor_id,enabled", profile.id);
        let grants = self.source.fetch_rows(DOCTOR_ACCESS_TABLE, &query).await?;

        let enabled = grants
            .iter()
            .any(|g| g.get("enabled").and_then(Value::as_bool).unwrap_or(false));
        info!(client_id = %profile.id, grants = grants.len(), enabled, "Doctor access loaded");
        self.signals.set_doctor_access_enabled(enabled);

        Ok(json!({ "enabled": enabled, "grants": grants }))
    }
}

#[async_trait]
impl RefreshStep for DoctorAccessStep {
    async fn run(&self) -> anyhow::Result<()> {
        store_outcome(&self.snapshots, Surface::Doctor, self.load()).await
    }
}

/// Today's lifestyle entries.
pub struct LifestyleStep {
    days: Arc<DayDataLoader>,
    snapshots: Arc<SurfaceSnapshots>,
    today: Today,
}

impl LifestyleStep {
    pub fn new(days: Arc<DayDataLoader>, snapshots: Arc<SurfaceSnapshots>) -> Self {
        Self {
            days,
            snapshots,
            today: local_today,
        }
    }

    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }

    async fn load(&self) -> LoaderResult<Value> {
        let today = (self.today)();
        let rows = self.days.load_day(LIFESTYLE_TABLE, today).await?;
        debug!(date = %today, entries = rows.len(), "Lifestyle entries loaded");
        Ok(json!({ "date": today.to_string(), "entries": rows.as_slice() }))
    }
}

#[async_trait]
impl RefreshStep for LifestyleStep {
    async fn run(&self) -> anyhow::Result<()> {
        store_outcome(&self.snapshots, Surface::Lifestyle, self.load()).await
    }
}

/// The last [`CHART_DAYS`] days of measurements.
pub struct ChartStep {
    days: Arc<DayDataLoader>,
    snapshots: Arc<SurfaceSnapshots>,
    today: Today,
}

impl ChartStep {
    pub fn new(days: Arc<DayDataLoader>, snapshots: Arc<SurfaceSnapshots>) -> Self {
        Self {
            days,
            snapshots,
            today: local_today,
        }
    }

    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }

    async fn load(&self) -> LoaderResult<Value> {
        let range = self
            .days
            .load_range(MEASUREMENTS_TABLE, (self.today)(), CHART_DAYS)
            .await?;
        let series: Map<String, Value> = range
            .into_iter()
            .map(|(date, rows)| (date.to_string(), Value::Array(rows.to_vec())))
            .collect();
        debug!(days = series.len(), "Chart series loaded");
        Ok(Value::Object(series))
    }
}

#[async_trait]
impl RefreshStep for ChartStep {
    async fn run(&self) -> anyhow::Result<()> {
        store_outcome(&self.snapshots, Surface::Chart, self.load()).await
    }
}

/// Register all three steps on `coordinator` over one row source.
///
/// Returns the shared profile loader so sign-out can invalidate it.
pub fn register_surface_steps(
    coordinator: &RefreshCoordinator,
    source: Arc<dyn RowSource>,
    signals: Arc<dyn UiSignals>,
    snapshots: Arc<SurfaceSnapshots>,
) -> Arc<ClientBootstrapLoader> {
    let bootstrap = Arc::new(ClientBootstrapLoader::new(source.clone()));
    let days = Arc::new(DayDataLoader::new(source.clone()));

    coordinator.register_step(
        Surface::Doctor,
        Arc::new(DoctorAccessStep::new(
            bootstrap.clone(),
            source,
            signals,
            snapshots.clone(),
        )),
    );
    coordinator.register_step(
        Surface::Lifestyle,
        Arc::new(LifestyleStep::new(days.clone(), snapshots.clone())),
    );
    coordinator.register_step(Surface::Chart, Arc::new(ChartStep::new(days, snapshots)));
    bootstrap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{unavailable, FakeSource};
    use crate::CLIENT_PROFILE_TABLE;
    use refresh_coalescer::{CoalescerConfig, RefreshFlags, StepOutcome};
    use ui_signal_ports::{NullDiagnosticSink, RecordingUiSignals};

    fn march_10() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn source() -> Arc<FakeSource> {
        let source = Arc::new(FakeSource::new());
        source.set_rows(CLIENT_PROFILE_TABLE, vec![json!({"id": "client-1"})]);
        source.set_rows(
            DOCTOR_ACCESS_TABLE,
            vec![
                json!({"doctor_id": "d-1", "enabled": false}),
                json!({"doctor_id": "d-2", "enabled": true}),
            ],
        );
        source.set_rows(LIFESTYLE_TABLE, vec![json!({"kind": "sleep", "hours": 7})]);
        source.set_rows(MEASUREMENTS_TABLE, vec![json!({"systolic": 120})]);
        source
    }

    #[tokio::test]
    async fn test_doctor_step_drives_toggle() {
        let source = source();
        let signals = Arc::new(RecordingUiSignals::new());
        let snapshots = Arc::new(SurfaceSnapshots::new());
        let step = DoctorAccessStep::new(
            Arc::new(ClientBootstrapLoader::new(source.clone())),
            source.clone(),
            signals.clone(),
            snapshots.clone(),
        );

        step.run().await.unwrap();
        assert_eq!(signals.last_doctor_access(), Some(true));
        assert_eq!(snapshots.data(Surface::Doctor).unwrap()["enabled"], json!(true));
        assert!(source
            .calls()
            .iter()
            .any(|(t, q)| t == DOCTOR_ACCESS_TABLE && q.starts_with("client_id=eq.client-1")));
    }

    #[tokio::test]
    async fn test_lifestyle_step_reads_today() {
        let source = source();
        let snapshots = Arc::new(SurfaceSnapshots::new());
        let step = LifestyleStep::new(Arc::new(DayDataLoader::new(source.clone())), snapshots.clone())
            .with_today(march_10);

        step.run().await.unwrap();
        let data = snapshots.data(Surface::Lifestyle).unwrap();
        assert_eq!(data["date"], json!("2026-03-10"));
        assert_eq!(data["entries"][0]["hours"], json!(7));
    }

    #[tokio::test]
    async fn test_chart_failure_keeps_previous_series() {
        let source = source();
        let snapshots = Arc::new(SurfaceSnapshots::new());
        let step = ChartStep::new(Arc::new(DayDataLoader::new(source.clone())), snapshots.clone())
            .with_today(march_10);

        step.run().await.unwrap();
        let before = snapshots.data(Surface::Chart).unwrap();
        assert_eq!(before.as_object().unwrap().len(), CHART_DAYS as usize);
        assert!(before.get("2026-03-04").is_some());

        source.fail(MEASUREMENTS_TABLE, unavailable(MEASUREMENTS_TABLE));
        assert!(step.run().await.is_err());

        let after = snapshots.get(Surface::Chart).unwrap();
        assert!(after.stale);
        assert_eq!(after.data, before);
    }

    #[tokio::test]
    async fn test_registered_steps_run_in_one_drain() {
        let source = source();
        let signals = Arc::new(RecordingUiSignals::new());
        let snapshots = Arc::new(SurfaceSnapshots::new());
        let coordinator = RefreshCoordinator::new(CoalescerConfig::default(), Arc::new(NullDiagnosticSink));
        let bootstrap = register_surface_steps(&coordinator, source.clone(), signals.clone(), snapshots.clone());

        source.fail(LIFESTYLE_TABLE, unavailable(LIFESTYLE_TABLE));
        let report = coordinator
            .request_refresh(RefreshFlags::all(), "startup")
            .await
            .unwrap();

        assert_eq!(report.passes, 1);
        assert!(report.steps[0].outcome.is_success());
        assert!(matches!(report.steps[1].outcome, StepOutcome::Failed(_)));
        assert!(report.steps[2].outcome.is_success());
        assert!(snapshots.get(Surface::Lifestyle).is_none());
        assert!(bootstrap.cached().is_some());
    }
}
