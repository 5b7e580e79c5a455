use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::logger::warn_if_slow;
use crate::prices::model::AssetSnapshot;
use crate::prices::repository::SnapshotRepository;

/// Snapshot store shared by the reconciler (single writer) and the read
/// endpoint (many readers). Maps repository failures into `StoreError`.
#[derive(Clone)]
pub struct SnapshotStore {
    repo: Arc<dyn SnapshotRepository>,
}

impl SnapshotStore {
    pub fn new(repo: Arc<dyn SnapshotRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self), target = "store")]
    pub async fn clear(&self) -> Result<(), StoreError> {
        debug!("clearing snapshot store");

        warn_if_slow("store_clear", Duration::from_millis(50), self.repo.clear())
            .await
            .map_err(StoreError::from)
    }

    #[instrument(skip(self, snapshot), target = "store", fields(crypto = %snapshot.crypto))]
    pub async fn upsert(&self, snapshot: &AssetSnapshot) -> Result<(), StoreError> {
        warn_if_slow(
            "store_upsert",
            Duration::from_millis(50),
            self.repo.upsert(snapshot),
        )
        .await
        .map_err(StoreError::from)
    }

    #[instrument(skip(self), target = "store")]
    pub async fn list_all(&self) -> Result<Vec<AssetSnapshot>, StoreError> {
        let rows = warn_if_slow("store_list_all", Duration::from_millis(100), self.repo.list_all())
            .await?;

        debug!(count = rows.len(), "snapshot store scanned");
        Ok(rows)
    }

    /// Newest `lastUpdated` currently stored, `None` when empty.
    pub async fn latest_update(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let rows = self.list_all().await?;
        Ok(rows.iter().map(|s| s.last_updated).max())
    }

    #[instrument(skip(self, snapshots), target = "store", fields(count = snapshots.len()))]
    pub async fn replace_all(&self, snapshots: &[AssetSnapshot]) -> Result<(), StoreError> {
        warn_if_slow(
            "store_replace_all",
            Duration::from_millis(200),
            self.repo.replace_all(snapshots),
        )
        .await
        .map_err(StoreError::from)
    }
}
