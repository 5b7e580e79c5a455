pub mod schema;

use std::sync::Arc;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tracing::info;

use crate::metrics::counters::Counters;
use crate::prices::memory::InMemorySnapshotRepository;
use crate::prices::repository::SnapshotRepository;
use crate::prices::repository_sqlx::SqlxSnapshotRepository;

pub const MEMORY_URL: &str = "memory://";

#[derive(Clone)]
pub struct Db {
    pub pool: AnyPool,
    url: String,
}

impl Db {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            url: database_url.to_string(),
        })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        if is_file_sqlite(&self.url) {
            // WAL lets the read endpoint scan while a cycle is writing.
            sqlx::query("PRAGMA journal_mode=WAL;")
                .execute(&self.pool)
                .await?;
        }
        schema::migrate(&self.pool).await
    }
}

/// Opens the snapshot repository named by `database_url`, running
/// migrations for SQL backends. Skipped malformed rows land in `counters`.
pub async fn open_repository(
    database_url: &str,
    counters: &Counters,
) -> anyhow::Result<Arc<dyn SnapshotRepository>> {
    if database_url == MEMORY_URL {
        info!("using in-memory snapshot store");
        return Ok(Arc::new(InMemorySnapshotRepository::new()));
    }

    let db = Db::connect(database_url).await?;
    db.migrate().await?;
    info!("snapshot database ready");

    Ok(Arc::new(
        SqlxSnapshotRepository::new(db.pool).with_skip_counter(counters.malformed_rows.clone()),
    ))
}

fn is_file_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:") && !url.contains(":memory:") && !url.contains("mode=memory")
}
