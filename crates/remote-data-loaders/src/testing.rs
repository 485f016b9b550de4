//! In-memory row source for loader and step tests.

use crate::{LoaderError, LoaderResult, RowSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
pub struct FakeSource {
    rows: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashMap<String, LoaderError>>,
    calls: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_rows(&self, table: &str, rows: Vec<Value>) {
        self.rows.lock().insert(table.to_string(), rows);
    }

    pub fn fail(&self, table: &str, err: LoaderError) {
        self.failing.lock().insert(table.to_string(), err);
    }

    pub fn recover(&self, table: &str) {
        self.failing.lock().remove(table);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, table: &str) -> usize {
        self.calls.lock().iter().filter(|(t, _)| t == table).count()
    }
}

#[async_trait]
impl RowSource for FakeSource {
    async fn fetch_rows(&self, table: &str, query: &str) -> LoaderResult<Vec<Value>> {
        self.calls.lock().push((table.to_string(), query.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failing.lock().get(table) {
            return Err(err.clone());
        }
        Ok(self.rows.lock().get(table).cloned().unwrap_or_default())
    }
}

pub fn unavailable(table: &str) -> LoaderError {
    LoaderError::Status {
        table: table.to_string(),
        status: 503,
        message: "unavailable".into(),
    }
}
