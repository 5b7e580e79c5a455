//! Applies a fetched batch to the snapshot store.
//!
//! A batch only reaches the reconciler after a successful fetch, so a failed
//! upstream call never clears anything. Writes from two reconciliations never
//! interleave: each one holds the writer lock from its clear to its last
//! upsert.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::livecoinwatch::RawAssetQuote;
use crate::prices::model::{AssetSnapshot, DeltaSet, PriceData};
use crate::prices::store::SnapshotStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Replace the whole set in one transaction. Readers never see an
    /// empty or partially rebuilt set.
    #[default]
    Swap,

    /// `clear()` then one `upsert()` per record on the live store. Readers
    /// may briefly see a partial set, never a partial record.
    ClearThenUpsert,
}

impl FromStr for ReconcileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swap" => Ok(Self::Swap),
            "clear-upsert" | "clear_upsert" => Ok(Self::ClearThenUpsert),
            other => Err(format!("unknown reconcile mode {other:?}")),
        }
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swap => f.write_str("swap"),
            Self::ClearThenUpsert => f.write_str("clear-upsert"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconcileSummary {
    /// Distinct assets now in the store.
    pub written: usize,
    /// Quotes dropped because a later quote carried the same name.
    pub duplicates: usize,
    pub at: DateTime<Utc>,
}

pub struct Reconciler {
    store: SnapshotStore,
    mode: ReconcileMode,
    writer: Mutex<()>,
}

impl Reconciler {
    pub fn new(store: SnapshotStore, mode: ReconcileMode) -> Self {
        Self {
            store,
            mode,
            writer: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Makes the store hold exactly the assets in `batch`, all stamped `now`.
    #[instrument(skip(self, batch), target = "reconciler", fields(mode = %self.mode, batch = batch.len()))]
    pub async fn reconcile(
        &self,
        batch: &[RawAssetQuote],
        now: DateTime<Utc>,
    ) -> Result<ReconcileSummary, StoreError> {
        let snapshots = map_batch(batch, now);
        let duplicates = batch.len() - snapshots.len();
        if duplicates > 0 {
            warn!(duplicates, "batch repeats asset names; last quote wins");
        }

        let _guard = self.writer.lock().await;

        match self.mode {
            ReconcileMode::Swap => {
                self.store.replace_all(&snapshots).await?;
            }
            ReconcileMode::ClearThenUpsert => {
                self.store.clear().await?;
                for s in &snapshots {
                    self.store.upsert(s).await?;
                }
            }
        }

        info!(
            written = snapshots.len(),
            at = %now,
            "prices reconciled"
        );

        Ok(ReconcileSummary {
            written: snapshots.len(),
            duplicates,
            at: now,
        })
    }
}

/// Maps quotes to snapshots keyed by display name.
///
/// Output keeps first-seen order; when a name repeats, the later quote's
/// figures replace the earlier ones.
pub fn map_batch(batch: &[RawAssetQuote], now: DateTime<Utc>) -> Vec<AssetSnapshot> {
    let mut out: Vec<AssetSnapshot> = Vec::with_capacity(batch.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(batch.len());

    for q in batch {
        let snap = to_snapshot(q, now);
        match index.get(q.name.as_str()) {
            Some(&i) => out[i] = snap,
            None => {
                index.insert(q.name.as_str(), out.len());
                out.push(snap);
            }
        }
    }

    out
}

fn to_snapshot(q: &RawAssetQuote, now: DateTime<Utc>) -> AssetSnapshot {
    AssetSnapshot {
        crypto: q.name.clone(),
        data: PriceData {
            rate: q.rate,
            volume: q.volume,
            cap: q.cap,
            delta: DeltaSet {
                hour: q.delta.hour,
                day: q.delta.day,
                week: q.delta.week,
                month: q.delta.month,
                quarter: q.delta.quarter,
                year: q.delta.year,
            },
        },
        last_updated: now,
    }
}
