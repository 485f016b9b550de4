//! Per-day table reads.

use crate::{LoaderError, LoaderResult, RowSource};
use chrono::{Duration as DateSpan, NaiveDate};
use futures_util::future::join_all;
use serde_json::Value;
use single_flight_loader::SingleFlightLoader;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Column every per-day table is filtered on.
pub const DAY_COLUMN: &str = "entry_date";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayKey {
    pub table: String,
    pub date: NaiveDate,
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.table, self.date)
    }
}

pub type DayRows = Arc<Vec<Value>>;

/// Loads one table's rows for one day, deduplicating concurrent reads of
/// the same `(table, date)`.
pub struct DayDataLoader {
    source: Arc<dyn RowSource>,
    flight: SingleFlightLoader<DayKey, DayRows, LoaderError>,
}

impl DayDataLoader {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self {
            source,
            flight: SingleFlightLoader::new(),
        }
    }

    pub async fn load_day(&self, table: &str, date: NaiveDate) -> LoaderResult<DayRows> {
        let key = DayKey {
            table: table.to_string(),
            date,
        };
        let pending = self.flight.load_or_join(key.clone(), || {
            let source = self.source.clone();
            async move {
                let query = format!("{}=eq.{}&order=created_at.asc", DAY_COLUMN, key.date);
                let rows = source.fetch_rows(&key.table, &query).await?;
                debug!(key = %key, rows = rows.len(), "Day loaded");
                Ok::<_, LoaderError>(Arc::new(rows))
            }
        });
        pending.await
    }

    /// Load `days` consecutive days ending at `last`, oldest first.
    ///
    /// Days are read concurrently; the first failure fails the range.
    pub async fn load_range(
        &self,
        table: &str,
        last: NaiveDate,
        days: u32,
    ) -> LoaderResult<BTreeMap<NaiveDate, DayRows>> {
        let dates: Vec<NaiveDate> = (0..days)
            .rev()
            .map(|back| last - DateSpan::days(i64::from(back)))
            .collect();
        let loads = dates.iter().map(|date| self.load_day(table, *date));
        let results = join_all(loads).await;

        dates
            .into_iter()
            .zip(results)
            .map(|(date, rows)| rows.map(|rows| (date, rows)))
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.flight.pending_count()
    }
}
