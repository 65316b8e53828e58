//! Storage backends for business plans.
//!
//! [`PlanRepository`] decouples the save workflow from PostgreSQL so the
//! same allocation and conflict handling runs against an in-memory map in
//! tests and offline use.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;

use famaplan_db::models::{BusinessPlan, PlanRecord};
use famaplan_db::queries::plans as plan_queries;

use super::session::with_plan_id;

/// A keyed store of business plans.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// All plans, most recently modified first.
    async fn list_plans(&self) -> Result<Vec<PlanRecord>>;

    /// Identifiers of every stored plan.
    async fn list_plan_ids(&self) -> Result<Vec<String>> {
        Ok(self.list_plans().await?.into_iter().map(|p| p.id).collect())
    }

    async fn get_plan(&self, id: &str) -> Result<Option<PlanRecord>>;

    /// Store a new plan. Returns `None`, leaving the store untouched, when
    /// `id` is already taken.
    async fn insert_plan(
        &self,
        id: &str,
        name: &str,
        data: &BusinessPlan,
    ) -> Result<Option<PlanRecord>>;

    /// Overwrite (or create) the plan stored under `id`.
    async fn update_plan(&self, id: &str, name: &str, data: &BusinessPlan) -> Result<PlanRecord>;

    /// Remove a plan. Returns `true` if it existed.
    async fn delete_plan(&self, id: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Plans stored in the `business_plans` table.
#[derive(Debug, Clone)]
pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn list_plans(&self) -> Result<Vec<PlanRecord>> {
        plan_queries::list_plans(&self.pool).await
    }

    async fn list_plan_ids(&self) -> Result<Vec<String>> {
        plan_queries::list_plan_ids(&self.pool).await
    }

    async fn get_plan(&self, id: &str) -> Result<Option<PlanRecord>> {
        plan_queries::get_plan(&self.pool, id).await
    }

    async fn insert_plan(
        &self,
        id: &str,
        name: &str,
        data: &BusinessPlan,
    ) -> Result<Option<PlanRecord>> {
        plan_queries::insert_plan(&self.pool, id, name, data).await
    }

    async fn update_plan(&self, id: &str, name: &str, data: &BusinessPlan) -> Result<PlanRecord> {
        plan_queries::upsert_plan(&self.pool, id, name, data).await
    }

    async fn delete_plan(&self, id: &str) -> Result<bool> {
        plan_queries::delete_plan(&self.pool, id).await
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Plans kept in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryPlanRepository {
    plans: RwLock<HashMap<String, PlanRecord>>,
}

impl MemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(id: &str, name: &str, data: &BusinessPlan) -> PlanRecord {
        PlanRecord {
            id: id.to_string(),
            name: name.to_string(),
            updated_at: Utc::now(),
            data: with_plan_id(data.clone(), id),
        }
    }
}

#[async_trait]
impl PlanRepository for MemoryPlanRepository {
    async fn list_plans(&self) -> Result<Vec<PlanRecord>> {
        let mut plans: Vec<PlanRecord> = self.plans.read().await.values().cloned().collect();
        plans.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(plans)
    }

    async fn get_plan(&self, id: &str) -> Result<Option<PlanRecord>> {
        Ok(self.plans.read().await.get(id).cloned())
    }

    async fn insert_plan(
        &self,
        id: &str,
        name: &str,
        data: &BusinessPlan,
    ) -> Result<Option<PlanRecord>> {
        let mut plans = self.plans.write().await;
        if plans.contains_key(id) {
            return Ok(None);
        }
        let record = Self::record(id, name, data);
        plans.insert(id.to_string(), record.clone());
        Ok(Some(record))
    }

    async fn update_plan(&self, id: &str, name: &str, data: &BusinessPlan) -> Result<PlanRecord> {
        let record = Self::record(id, name, data);
        self.plans
            .write()
            .await
            .insert(id.to_string(), record.clone());
        Ok(record)
    }

    async fn delete_plan(&self, id: &str) -> Result<bool> {
        Ok(self.plans.write().await.remove(id).is_some())
    }
}
