use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Latest snapshot per asset, keyed by display name.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS prices (
  crypto TEXT PRIMARY KEY,
  rate DOUBLE PRECISION NOT NULL,
  volume DOUBLE PRECISION NOT NULL,
  cap DOUBLE PRECISION NOT NULL,
  delta_hour DOUBLE PRECISION NOT NULL,
  delta_day DOUBLE PRECISION NOT NULL,
  delta_week DOUBLE PRECISION NOT NULL,
  delta_month DOUBLE PRECISION NOT NULL,
  delta_quarter DOUBLE PRECISION NOT NULL,
  delta_year DOUBLE PRECISION NOT NULL,
  last_updated_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
