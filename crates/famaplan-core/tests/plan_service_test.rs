//! Integration tests for the plan save workflow: identifier allocation on
//! first save, stable identifiers afterwards, and recovery from identifier
//! conflicts.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeZone};

use famaplan_core::plan::{
    MAX_ALLOCATION_ATTEMPTS, MemoryPlanRepository, PgPlanRepository, PlanPatch, PlanRepository,
    PlanSession, SaveError, prepare_plan_id, save_plan,
};
use famaplan_db::models::{BusinessPlan, Identification, PlanRecord, Swot, UNNAMED_PLAN};
use famaplan_test_utils::{create_test_db, drop_test_db};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn new_session(promoter: &str) -> PlanSession {
    let mut s = PlanSession::new(Local.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap());
    s.apply(PlanPatch::Identification(Identification {
        nome_promotor: promoter.to_string(),
        ..Identification::default()
    }));
    s
}

/// Repository whose snapshot hides the plans other authors inserted, so
/// every allocation it feeds collides with an existing row.
struct StaleSnapshotRepository {
    inner: MemoryPlanRepository,
    /// Identifiers visible in `list_plans`; the rest exist but are hidden.
    visible: std::sync::Mutex<Vec<String>>,
    inserts: AtomicUsize,
}

impl StaleSnapshotRepository {
    async fn with_hidden(hidden: &[&str]) -> Self {
        let inner = MemoryPlanRepository::new();
        for id in hidden {
            inner
                .insert_plan(id, "other author", &BusinessPlan::default())
                .await
                .unwrap();
        }
        Self {
            inner,
            visible: std::sync::Mutex::new(Vec::new()),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Reveal an identifier, as if the snapshot had been refreshed.
    fn reveal(&self, id: &str) {
        self.visible.lock().unwrap().push(id.to_string());
    }
}

#[async_trait]
impl PlanRepository for StaleSnapshotRepository {
    async fn list_plans(&self) -> Result<Vec<PlanRecord>> {
        let visible = self.visible.lock().unwrap().clone();
        let plans = self.inner.list_plans().await?;
        Ok(plans.into_iter().filter(|p| visible.contains(&p.id)).collect())
    }

    async fn get_plan(&self, id: &str) -> Result<Option<PlanRecord>> {
        self.inner.get_plan(id).await
    }

    async fn insert_plan(
        &self,
        id: &str,
        name: &str,
        data: &BusinessPlan,
    ) -> Result<Option<PlanRecord>> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let result = self.inner.insert_plan(id, name, data).await?;
        if result.is_none() {
            // The conflict makes the caller re-read; let it see the row now.
            self.reveal(id);
        }
        Ok(result)
    }

    async fn update_plan(&self, id: &str, name: &str, data: &BusinessPlan) -> Result<PlanRecord> {
        self.inner.update_plan(id, name, data).await
    }

    async fn delete_plan(&self, id: &str) -> Result<bool> {
        self.inner.delete_plan(id).await
    }
}

// ===========================================================================
// In-memory repository
// ===========================================================================

#[tokio::test]
async fn first_save_allocates_and_later_saves_keep_the_id() {
    let repo = MemoryPlanRepository::new();
    repo.insert_plan("PN 2024-0004", "x", &BusinessPlan::default())
        .await
        .unwrap();
    repo.insert_plan("PN 2023-0020", "y", &BusinessPlan::default())
        .await
        .unwrap();

    let mut session = new_session("Ana Silva");
    let record = save_plan(&repo, &mut session, today()).await.unwrap();
    assert_eq!(record.id, "PN 2024-0005");
    assert_eq!(record.name, "Ana Silva");
    assert_eq!(session.plan_id(), Some("PN 2024-0005"));
    assert_eq!(session.plan().rececao.projeto_id, "PN 2024-0005");
    assert!(session.is_persisted());
    assert!(!session.is_dirty());

    session.apply(PlanPatch::Swot(Swot {
        pontos_fortes: vec!["Experiência".into()],
        ..Swot::default()
    }));
    assert!(session.is_dirty());
    let record = save_plan(&repo, &mut session, today()).await.unwrap();
    assert_eq!(record.id, "PN 2024-0005");
    assert_eq!(repo.list_plans().await.unwrap().len(), 3);

    let stored = repo.get_plan("PN 2024-0005").await.unwrap().unwrap();
    assert_eq!(stored.data.swot.pontos_fortes, vec!["Experiência".to_string()]);
}

#[tokio::test]
async fn blank_promoter_saves_as_unnamed() {
    let repo = MemoryPlanRepository::new();
    let mut session = new_session("   ");
    let record = save_plan(&repo, &mut session, today()).await.unwrap();
    assert_eq!(record.name, UNNAMED_PLAN);
    assert_eq!(record.id, "PN 2024-0001");
}

#[tokio::test]
async fn prepare_assigns_provisional_id_once() {
    let repo = MemoryPlanRepository::new();
    repo.insert_plan("PN 2024-0001", "x", &BusinessPlan::default())
        .await
        .unwrap();

    let mut session = new_session("Ana");
    let id = prepare_plan_id(&repo, &mut session, today()).await.unwrap();
    assert_eq!(id, "PN 2024-0002");
    assert!(!session.is_persisted());

    repo.insert_plan("PN 2024-0002", "y", &BusinessPlan::default())
        .await
        .unwrap();
    let again = prepare_plan_id(&repo, &mut session, today()).await.unwrap();
    assert_eq!(again, "PN 2024-0002");
}

#[tokio::test]
async fn colliding_provisional_id_is_replaced_on_save() {
    let repo = MemoryPlanRepository::new();
    let mut mine = new_session("Ana");
    let mut theirs = new_session("Rui");

    // Both authors see the same empty snapshot.
    prepare_plan_id(&repo, &mut mine, today()).await.unwrap();
    prepare_plan_id(&repo, &mut theirs, today()).await.unwrap();
    assert_eq!(mine.plan_id(), theirs.plan_id());

    let first = save_plan(&repo, &mut theirs, today()).await.unwrap();
    let second = save_plan(&repo, &mut mine, today()).await.unwrap();

    assert_eq!(first.id, "PN 2024-0001");
    assert_eq!(second.id, "PN 2024-0002");
    assert_eq!(mine.plan().rececao.projeto_id, "PN 2024-0002");
    assert_eq!(
        repo.get_plan("PN 2024-0001").await.unwrap().unwrap().name,
        "Rui"
    );
}

#[tokio::test]
async fn stale_snapshot_retries_with_fresh_allocation() {
    let repo = StaleSnapshotRepository::with_hidden(&["PN 2024-0001"]).await;
    let mut session = new_session("Ana");

    let record = save_plan(&repo, &mut session, today()).await.unwrap();
    assert_eq!(record.id, "PN 2024-0002");
    assert_eq!(repo.inserts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_conflicts_give_up() {
    let repo =
        StaleSnapshotRepository::with_hidden(&["PN 2024-0001", "PN 2024-0002", "PN 2024-0003"])
            .await;
    let mut session = new_session("Ana");
    let before = session.plan().clone();

    let err = save_plan(&repo, &mut session, today()).await.unwrap_err();
    assert!(matches!(err, SaveError::AllocationConflict(n) if n == MAX_ALLOCATION_ATTEMPTS));
    assert_eq!(repo.inserts.load(Ordering::SeqCst), MAX_ALLOCATION_ATTEMPTS);
    assert!(!session.is_persisted());
    assert!(session.plan_id().is_none());
    assert_eq!(session.plan().identificacao.nome_promotor, before.identificacao.nome_promotor);
}

// ===========================================================================
// PostgreSQL repository
// ===========================================================================

#[tokio::test]
async fn pg_save_allocates_and_detects_conflicts() {
    let (pool, db_name) = create_test_db().await;
    let repo = PgPlanRepository::new(pool.clone());

    let mut mine = new_session("Ana Silva");
    let mut theirs = new_session("Rui Costa");
    prepare_plan_id(&repo, &mut mine, today()).await.unwrap();
    prepare_plan_id(&repo, &mut theirs, today()).await.unwrap();

    let first = save_plan(&repo, &mut theirs, today()).await.unwrap();
    let second = save_plan(&repo, &mut mine, today()).await.unwrap();
    assert_eq!(first.id, "PN 2024-0001");
    assert_eq!(second.id, "PN 2024-0002");

    let loaded = repo.get_plan("PN 2024-0002").await.unwrap().unwrap();
    let resumed = PlanSession::from_record(loaded);
    assert_eq!(resumed.plan().identificacao.nome_promotor, "Ana Silva");
    assert_eq!(resumed.plan().rececao.projeto_id, "PN 2024-0002");
    assert!(resumed.is_persisted());

    assert!(repo.delete_plan("PN 2024-0001").await.unwrap());
    assert_eq!(repo.list_plan_ids().await.unwrap(), vec!["PN 2024-0002".to_string()]);

    pool.close().await;
    drop_test_db(&db_name).await;
}
