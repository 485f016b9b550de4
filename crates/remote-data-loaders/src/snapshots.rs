//! Last good content per surface.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use refresh_coalescer::Surface;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceSnapshot {
    pub data: Value,
    pub updated_at: DateTime<Utc>,
    /// The latest refresh failed; `data` is from an earlier one.
    pub stale: bool,
    pub last_error: Option<String>,
}

/// What each surface shows.
///
/// A failed refresh marks the surface stale but keeps its content.
#[derive(Default)]
pub struct SurfaceSnapshots {
    entries: RwLock<HashMap<Surface, SurfaceSnapshot>>,
}

impl SurfaceSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, surface: Surface, data: Value) {
        self.entries.write().insert(
            surface,
            SurfaceSnapshot {
                data,
                updated_at: Utc::now(),
                stale: false,
                last_error: None,
            },
        );
    }

    /// Record a failed refresh. Has no effect on a surface that never loaded.
    pub fn mark_failed(&self, surface: Surface, error: &str) {
        if let Some(entry) = self.entries.write().get_mut(&surface) {
            entry.stale = true;
            entry.last_error = Some(error.to_string());
        }
    }

    pub fn get(&self, surface: Surface) -> Option<SurfaceSnapshot> {
        self.entries.read().get(&surface).cloned()
    }

    pub fn data(&self, surface: Surface) -> Option<Value> {
        self.entries.read().get(&surface).map(|s| s.data.clone())
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
