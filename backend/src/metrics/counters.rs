use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::time::from_epoch_ms;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub cycles: Arc<AtomicU64>,
    pub updated: Arc<AtomicU64>,

    // failure reasons
    pub fetch_failed: Arc<AtomicU64>,
    pub store_failed: Arc<AtomicU64>,

    /// Stored rows the read path skipped because they failed to decode.
    pub malformed_rows: Arc<AtomicU64>,

    /// Epoch ms of the last successful reconciliation, 0 if none yet.
    pub last_success_ms: Arc<AtomicI64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersView {
    pub cycles: u64,
    pub updated: u64,
    pub fetch_failed: u64,
    pub store_failed: u64,
    pub malformed_rows: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl Counters {
    pub fn snapshot(&self) -> CountersView {
        let last_ms = self.last_success_ms.load(Ordering::Relaxed);
        CountersView {
            cycles: self.cycles.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            store_failed: self.store_failed.load(Ordering::Relaxed),
            malformed_rows: self.malformed_rows.load(Ordering::Relaxed),
            last_success: (last_ms > 0).then(|| from_epoch_ms(last_ms)).flatten(),
        }
    }
}
