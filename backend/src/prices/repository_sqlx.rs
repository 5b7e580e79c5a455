use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Row};

use crate::prices::model::{AssetSnapshot, DeltaSet, PriceData};
use crate::prices::repository::SnapshotRepository;
use crate::time::{from_epoch_ms, to_epoch_ms};

/// SQLx-backed implementation of SnapshotRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxSnapshotRepository {
    pool: AnyPool,
    skipped_rows: Arc<AtomicU64>,
}

impl SqlxSnapshotRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            pool,
            skipped_rows: Arc::default(),
        }
    }

    /// Counts malformed rows skipped by `list_all` into `counter`.
    pub fn with_skip_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.skipped_rows = counter;
        self
    }
}

#[async_trait]
impl SnapshotRepository for SqlxSnapshotRepository {
    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM prices;")
            .execute(&self.pool)
            .await
            .context("delete prices")?;
        Ok(())
    }

    async fn upsert(&self, snapshot: &AssetSnapshot) -> anyhow::Result<()> {
        upsert_query(snapshot)
            .execute(&self.pool)
            .await
            .with_context(|| format!("upsert {}", snapshot.crypto))?;
        Ok(())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<AssetSnapshot>> {
        let rows = sqlx::query(
            r#"
SELECT
  crypto, rate, volume, cap,
  delta_hour, delta_day, delta_week,
  delta_month, delta_quarter, delta_year,
  last_updated_ms
FROM prices
ORDER BY crypto;
"#,
        )
        .fetch_all(&self.pool)
        .await
        .context("select prices")?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_snapshot(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the read
                    self.skipped_rows.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "skipping malformed price row");
                }
            }
        }

        Ok(out)
    }

    async fn replace_all(&self, snapshots: &[AssetSnapshot]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.context("begin replace")?;

        sqlx::query("DELETE FROM prices;")
            .execute(&mut *tx)
            .await
            .context("delete prices")?;

        for s in snapshots {
            upsert_query(s)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("upsert {}", s.crypto))?;
        }

        tx.commit().await.context("commit replace")?;
        Ok(())
    }
}

/* =========================
Statements + row mapping
========================= */

/// Numbered placeholders; the Any driver does not rewrite `?` for Postgres.
const UPSERT_SQL: &str = r#"
INSERT INTO prices (
  crypto, rate, volume, cap,
  delta_hour, delta_day, delta_week,
  delta_month, delta_quarter, delta_year,
  last_updated_ms
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT (crypto) DO UPDATE SET
  rate = excluded.rate,
  volume = excluded.volume,
  cap = excluded.cap,
  delta_hour = excluded.delta_hour,
  delta_day = excluded.delta_day,
  delta_week = excluded.delta_week,
  delta_month = excluded.delta_month,
  delta_quarter = excluded.delta_quarter,
  delta_year = excluded.delta_year,
  last_updated_ms = excluded.last_updated_ms;
"#;

fn upsert_query(s: &AssetSnapshot) -> Query<'static, Any, AnyArguments<'static>> {
    let d = &s.data.delta;

    sqlx::query(UPSERT_SQL)
        .bind(s.crypto.clone())
        .bind(s.data.rate)
        .bind(s.data.volume)
        .bind(s.data.cap)
        .bind(d.hour)
        .bind(d.day)
        .bind(d.week)
        .bind(d.month)
        .bind(d.quarter)
        .bind(d.year)
        .bind(to_epoch_ms(s.last_updated))
}

fn row_to_snapshot(r: &AnyRow) -> anyhow::Result<AssetSnapshot> {
    let crypto: String = r.try_get("crypto")?;
    if crypto.is_empty() {
        return Err(anyhow!("empty crypto key"));
    }

    let ms: i64 = r.try_get("last_updated_ms")?;
    let last_updated =
        from_epoch_ms(ms).ok_or_else(|| anyhow!("last_updated_ms out of range: {ms}"))?;

    Ok(AssetSnapshot {
        crypto,
        data: PriceData {
            rate: r.try_get("rate")?,
            volume: r.try_get("volume")?,
            cap: r.try_get("cap")?,
            delta: DeltaSet {
                hour: r.try_get("delta_hour")?,
                day: r.try_get("delta_day")?,
                week: r.try_get("delta_week")?,
                month: r.try_get("delta_month")?,
                quarter: r.try_get("delta_quarter")?,
                year: r.try_get("delta_year")?,
            },
        },
        last_updated,
    })
}
