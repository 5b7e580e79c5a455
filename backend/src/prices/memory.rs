use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::prices::model::AssetSnapshot;
use crate::prices::repository::SnapshotRepository;

/// In-process snapshot store keyed by asset name.
#[derive(Clone, Default)]
pub struct InMemorySnapshotRepository {
    inner: Arc<RwLock<HashMap<String, AssetSnapshot>>>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn clear(&self) -> Result<()> {
        self.inner.write().await.clear();
        Ok(())
    }

    async fn upsert(&self, snapshot: &AssetSnapshot) -> Result<()> {
        let mut g = self.inner.write().await;
        g.insert(snapshot.crypto.clone(), snapshot.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AssetSnapshot>> {
        let g = self.inner.read().await;
        Ok(g.values().cloned().collect())
    }

    async fn replace_all(&self, snapshots: &[AssetSnapshot]) -> Result<()> {
        // Build outside the lock; the swap itself is the only write.
        let fresh: HashMap<String, AssetSnapshot> = snapshots
            .iter()
            .map(|s| (s.crypto.clone(), s.clone()))
            .collect();

        *self.inner.write().await = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::model::PriceData;
    use chrono::Utc;

    fn snap(name: &str, rate: f64) -> AssetSnapshot {
        AssetSnapshot {
            crypto: name.into(),
            data: PriceData {
                rate,
                ..PriceData::default()
            },
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_identity() {
        let repo = InMemorySnapshotRepository::new();
        repo.upsert(&snap("Bitcoin", 1.0)).await.unwrap();
        repo.upsert(&snap("Bitcoin", 2.0)).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data.rate, 2.0);
    }

    #[tokio::test]
    async fn replace_all_drops_absent_keys() {
        let repo = InMemorySnapshotRepository::new();
        repo.upsert(&snap("A", 1.0)).await.unwrap();

        repo.replace_all(&[snap("B", 1.0), snap("C", 1.0)])
            .await
            .unwrap();

        let mut names: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.crypto)
            .collect();
        names.sort();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let repo = InMemorySnapshotRepository::new();
        repo.upsert(&snap("A", 1.0)).await.unwrap();
        repo.clear().await.unwrap();
        assert!(repo.list_all().await.unwrap().is_empty());
    }
}
