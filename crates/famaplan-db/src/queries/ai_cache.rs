//! Database query functions for the `ai_cache` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::CacheRow;

/// Fetch the cached payload stored under a normalized summary key.
pub async fn get_entry(pool: &PgPool, summary_key: &str) -> Result<Option<CacheRow>> {
    let row = sqlx::query_as::<_, CacheRow>(
        "SELECT summary_key, generated_data, created_at FROM ai_cache WHERE summary_key = $1",
    )
    .bind(summary_key)
    .fetch_optional(pool)
    .await
    .context("failed to read ai cache")?;

    Ok(row)
}

/// Store a payload under a key, overwriting any previous entry.
pub async fn put_entry(
    pool: &PgPool,
    summary_key: &str,
    generated_data: &serde_json::Value,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO ai_cache (summary_key, generated_data, created_at) \
         VALUES ($1, $2, now()) \
         ON CONFLICT (summary_key) DO UPDATE \
         SET generated_data = EXCLUDED.generated_data, created_at = EXCLUDED.created_at",
    )
    .bind(summary_key)
    .bind(Json(generated_data))
    .execute(pool)
    .await
    .with_context(|| format!("failed to write ai cache entry {summary_key:?}"))?;

    Ok(())
}

/// Number of cached summaries.
pub async fn count_entries(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_cache")
        .fetch_one(pool)
        .await
        .context("failed to count ai cache entries")?;

    Ok(count)
}
