use anyhow::Result;
use async_trait::async_trait;

use crate::prices::model::AssetSnapshot;

/// Keyed persistence for asset snapshots. One record per `crypto`.
///
/// Every write replaces whole records; a reader never observes a
/// half-written snapshot.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Removes every record.
    async fn clear(&self) -> Result<()>;

    /// Inserts the record or replaces the one with the same identity.
    async fn upsert(&self, snapshot: &AssetSnapshot) -> Result<()>;

    /// Every current record, in no particular order.
    async fn list_all(&self) -> Result<Vec<AssetSnapshot>>;

    /// Replaces the whole set in one step: readers see either the previous
    /// set or `snapshots`, never anything in between.
    async fn replace_all(&self, snapshots: &[AssetSnapshot]) -> Result<()>;
}
