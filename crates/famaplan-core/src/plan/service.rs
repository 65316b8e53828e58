//! Plan save workflow.
//!
//! A new plan receives its identifier from a snapshot of the stored ones.
//! Two authors working from the same snapshot compute the same identifier;
//! the store's uniqueness check rejects the second insert, and the loser
//! re-reads the snapshot and tries again with the next free identifier.

use chrono::Datelike;
use thiserror::Error;
use tracing::{debug, info, warn};

use famaplan_db::models::PlanRecord;

use super::id::{PlanId, next_plan_id};
use super::repository::PlanRepository;
use super::session::{PlanPatch, PlanSession};

/// How many identifiers a single save will try before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not allocate a free plan identifier after {0} attempts")]
    AllocationConflict(usize),

    #[error("plan is marked as persisted but has no identifier")]
    MissingId,

    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Compute the next identifier for the year of `today` from the store.
pub async fn allocate_plan_id(
    repo: &dyn PlanRepository,
    today: impl Datelike,
) -> anyhow::Result<PlanId> {
    let ids = repo.list_plan_ids().await?;
    let id = next_plan_id(ids.iter().map(String::as_str), today);
    debug!(%id, existing = ids.len(), "allocated plan id");
    Ok(id)
}

/// Give the session a provisional identifier if it has none yet.
///
/// Returns the identifier the session now carries. A provisional identifier
/// is only a display hint: it is re-checked when the plan is first saved.
pub async fn prepare_plan_id(
    repo: &dyn PlanRepository,
    session: &mut PlanSession,
    today: impl Datelike,
) -> anyhow::Result<String> {
    if let Some(id) = session.plan_id() {
        return Ok(id.to_string());
    }
    let id = allocate_plan_id(repo, today).await?;
    session.apply(PlanPatch::AssignPlanId(id));
    Ok(id.to_string())
}

/// Persist the session's plan.
///
/// Plans already stored are overwritten under their identifier. New plans
/// are inserted under their provisional identifier (or a freshly allocated
/// one); if that identifier turns out to be taken, a new one is allocated,
/// up to [`MAX_ALLOCATION_ATTEMPTS`] times. On success the session adopts
/// the stored record.
pub async fn save_plan<D>(
    repo: &dyn PlanRepository,
    session: &mut PlanSession,
    today: D,
) -> Result<PlanRecord, SaveError>
where
    D: Datelike + Copy,
{
    let name = session.plan().display_name().to_string();

    if session.is_persisted() {
        let id = session.plan_id().ok_or(SaveError::MissingId)?.to_string();
        let record = repo.update_plan(&id, &name, session.plan()).await?;
        info!(id = %record.id, name = %record.name, "plan updated");
        session.mark_saved(&record);
        return Ok(record);
    }

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let id = match session.plan_id() {
            Some(id) => id.to_string(),
            None => {
                let id = allocate_plan_id(repo, today).await?;
                session.apply(PlanPatch::AssignPlanId(id));
                id.to_string()
            }
        };

        if let Some(record) = repo.insert_plan(&id, &name, session.plan()).await? {
            info!(id = %record.id, name = %record.name, "plan created");
            session.mark_saved(&record);
            return Ok(record);
        }

        warn!(%id, attempt, "plan id already taken, allocating another");
        session.clear_provisional_id();
    }

    Err(SaveError::AllocationConflict(MAX_ALLOCATION_ATTEMPTS))
}
