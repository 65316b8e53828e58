//! Database query functions for the `business_plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::{BusinessPlan, PlanRecord, PlanRow};

const COLUMNS: &str = "id, name, sumario_executivo, identificacao, analise_mercado, \
     projeto_negocio, recursos_humanos, estrategia, swot, investimento, financiamento, \
     projecoes, rececao, updated_at";

/// Insert a plan under a fresh identifier.
///
/// Returns `None` when a plan with that identifier already exists; the
/// existing row is left untouched. This is how concurrent allocations of
/// the same identifier are detected.
pub async fn insert_plan(
    pool: &PgPool,
    id: &str,
    name: &str,
    data: &BusinessPlan,
) -> Result<Option<PlanRecord>> {
    let sql = format!(
        "INSERT INTO business_plans \
         (id, name, sumario_executivo, identificacao, analise_mercado, projeto_negocio, \
          recursos_humanos, estrategia, swot, investimento, financiamento, projecoes, rececao, \
          updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now()) \
         ON CONFLICT (id) DO NOTHING \
         RETURNING {COLUMNS}"
    );
    let row = bind_sections(sqlx::query_as::<_, PlanRow>(&sql), id, name, data)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("failed to insert plan {id}"))?;

    Ok(row.map(PlanRecord::from))
}

/// Insert or overwrite the plan stored under `id`, bumping `updated_at`.
pub async fn upsert_plan(
    pool: &PgPool,
    id: &str,
    name: &str,
    data: &BusinessPlan,
) -> Result<PlanRecord> {
    let sql = format!(
        "INSERT INTO business_plans \
         (id, name, sumario_executivo, identificacao, analise_mercado, projeto_negocio, \
          recursos_humanos, estrategia, swot, investimento, financiamento, projecoes, rececao, \
          updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now()) \
         ON CONFLICT (id) DO UPDATE SET \
           name = EXCLUDED.name, \
           sumario_executivo = EXCLUDED.sumario_executivo, \
           identificacao = EXCLUDED.identificacao, \
           analise_mercado = EXCLUDED.analise_mercado, \
           projeto_negocio = EXCLUDED.projeto_negocio, \
           recursos_humanos = EXCLUDED.recursos_humanos, \
           estrategia = EXCLUDED.estrategia, \
           swot = EXCLUDED.swot, \
           investimento = EXCLUDED.investimento, \
           financiamento = EXCLUDED.financiamento, \
           projecoes = EXCLUDED.projecoes, \
           rececao = EXCLUDED.rececao, \
           updated_at = now() \
         RETURNING {COLUMNS}"
    );
    let row = bind_sections(sqlx::query_as::<_, PlanRow>(&sql), id, name, data)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to save plan {id}"))?;

    Ok(row.into())
}

/// Fetch a plan by its identifier.
pub async fn get_plan(pool: &PgPool, id: &str) -> Result<Option<PlanRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM business_plans WHERE id = $1");
    let row = sqlx::query_as::<_, PlanRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(row.map(PlanRecord::from))
}

/// List all plans, most recently modified first.
pub async fn list_plans(pool: &PgPool) -> Result<Vec<PlanRecord>> {
    let sql = format!("SELECT {COLUMNS} FROM business_plans ORDER BY updated_at DESC, id DESC");
    let rows = sqlx::query_as::<_, PlanRow>(&sql)
        .fetch_all(pool)
        .await
        .context("failed to list plans")?;

    Ok(rows.into_iter().map(PlanRecord::from).collect())
}

/// List only plan identifiers. Cheaper than [`list_plans`] when the caller
/// just needs to allocate the next one.
pub async fn list_plan_ids(pool: &PgPool) -> Result<Vec<String>> {
    let ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM business_plans ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to list plan ids")?;

    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Number of stored plans.
pub async fn count_plans(pool: &PgPool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM business_plans")
        .fetch_one(pool)
        .await
        .context("failed to count plans")?;

    Ok(count)
}

/// Delete a plan. Returns `true` if a row was removed.
pub async fn delete_plan(pool: &PgPool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM business_plans WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to delete plan {id}"))?;

    Ok(result.rows_affected() > 0)
}

/// Bind the id, name and the eleven section columns in table order.
fn bind_sections<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, PlanRow, sqlx::postgres::PgArguments>,
    id: &'q str,
    name: &'q str,
    data: &'q BusinessPlan,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, PlanRow, sqlx::postgres::PgArguments> {
    query
        .bind(id)
        .bind(name)
        .bind(Json(&data.sumario_executivo))
        .bind(Json(&data.identificacao))
        .bind(Json(&data.analise_mercado))
        .bind(Json(&data.projeto_negocio))
        .bind(Json(&data.recursos_humanos))
        .bind(Json(&data.estrategia))
        .bind(Json(&data.swot))
        .bind(Json(&data.investimento))
        .bind(Json(&data.financiamento))
        .bind(Json(&data.projecoes))
        .bind(Json(&data.rececao))
}
