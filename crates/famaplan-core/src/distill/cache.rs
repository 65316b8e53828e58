//! Stores for distillation results, keyed by normalized summary.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::warn;

use famaplan_db::queries::ai_cache;

use super::payload::{SectionPayload, distillation_schema};
use crate::schema::validate;

/// A key-value store of distillation results.
///
/// Entries never expire. `put` on an existing key overwrites it.
#[async_trait]
pub trait SummaryCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<SectionPayload>>;

    async fn put(&self, key: &str, payload: &SectionPayload) -> Result<()>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemorySummaryCache {
    entries: RwLock<HashMap<String, SectionPayload>>,
}

impl MemorySummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SummaryCache for MemorySummaryCache {
    async fn get(&self, key: &str) -> Result<Option<SectionPayload>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, payload: &SectionPayload) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), payload.clone());
        Ok(())
    }
}

/// Cache backed by the `ai_cache` table.
#[derive(Debug, Clone)]
pub struct PgSummaryCache {
    pool: PgPool,
}

impl PgSummaryCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SummaryCache for PgSummaryCache {
    /// Entries that no longer match the distillation schema read as misses.
    async fn get(&self, key: &str) -> Result<Option<SectionPayload>> {
        let Some(row) = ai_cache::get_entry(&self.pool, key).await? else {
            return Ok(None);
        };
        let value = row.generated_data.0;

        if let Err(e) = validate(&value, &distillation_schema()) {
            warn!(key, error = %e, "ignoring cached entry with unexpected shape");
            return Ok(None);
        }
        match serde_json::from_value::<SectionPayload>(value) {
            Ok(payload) => match payload.check() {
                Ok(()) => Ok(Some(payload)),
                Err(e) => {
                    warn!(key, error = %e, "ignoring cached entry with unexpected shape");
                    Ok(None)
                }
            },
            Err(e) => {
                warn!(key, error = %e, "ignoring undecodable cached entry");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, payload: &SectionPayload) -> Result<()> {
        let value = serde_json::to_value(payload)?;
        ai_cache::put_entry(&self.pool, key, &value).await
    }
}
