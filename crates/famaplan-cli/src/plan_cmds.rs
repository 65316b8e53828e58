//! CLI handlers for `famaplan plan` subcommands.
//!
//! Implements:
//! - `famaplan plan new <file>`         -- write a fresh draft
//! - `famaplan plan list [--search q]`  -- list persisted plans
//! - `famaplan plan show <plan-id>`     -- show one persisted plan
//! - `famaplan plan next-id`            -- identifier a new plan would get now
//! - `famaplan plan save <file>`        -- persist a draft
//! - `famaplan plan load <plan-id> <file>` -- write a persisted plan to a draft
//! - `famaplan plan delete <plan-id>`   -- delete a persisted plan

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use sqlx::PgPool;
use tracing::{debug, info};

use famaplan_core::plan::{
    PgPlanRepository, PlanRepository, PlanSession, allocate_plan_id, save_plan,
};
use famaplan_db::models::{BusinessPlan, PlanRecord};

use crate::PlanCommands;
use crate::draft::{create_draft, load_draft, save_draft};

// -----------------------------------------------------------------------
// Public entry points
// -----------------------------------------------------------------------

/// Write a fresh draft. Needs no database.
pub fn cmd_new(file: &Path, force: bool) -> Result<()> {
    let session = PlanSession::new(Local::now());
    create_draft(file, &session, force)?;
    println!("Draft written to {}", file.display());
    println!();
    println!("Fill in the executive summary, then run `famaplan distill {}`.", file.display());
    Ok(())
}

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    let repo = PgPlanRepository::new(pool.clone());
    match command {
        PlanCommands::New { file, force } => cmd_new(&file, force),
        PlanCommands::List { search } => cmd_list(&repo, search.as_deref()).await,
        PlanCommands::Show { plan_id } => cmd_show(&repo, &plan_id).await,
        PlanCommands::NextId => cmd_next_id(&repo).await,
        PlanCommands::Save { file } => cmd_save(&repo, &file).await,
        PlanCommands::Load {
            plan_id,
            file,
            force,
        } => cmd_load(&repo, &plan_id, &file, force).await,
        PlanCommands::Delete { plan_id } => cmd_delete(&repo, &plan_id).await,
    }
}

// -----------------------------------------------------------------------
// famaplan plan list
// -----------------------------------------------------------------------

/// Keep the plans whose name or identifier contains `query`, ignoring case.
fn filter_plans(plans: Vec<PlanRecord>, query: &str) -> Vec<PlanRecord> {
    let query = query.trim().to_lowercase();
    plans
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&query) || p.id.to_lowercase().contains(&query))
        .collect()
}

async fn cmd_list(repo: &dyn PlanRepository, search: Option<&str>) -> Result<()> {
    let mut plans = repo.list_plans().await?;
    let total = plans.len();
    if let Some(query) = search {
        plans = filter_plans(plans, query);
    }
    debug!(total, shown = plans.len(), ?search, "listing plans");

    if plans.is_empty() {
        match search {
            Some(query) if total > 0 => println!("No plans match {query:?}."),
            _ => println!("No plans found. Use `famaplan plan new <file>` to start one."),
        }
        return Ok(());
    }

    let id_w = plans.iter().map(|p| p.id.len()).max().unwrap_or(2).max(2);
    let name_w = plans
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    println!("{:<id_w$}  {:<name_w$}  UPDATED", "ID", "NAME");
    for plan in &plans {
        println!(
            "{:<id_w$}  {:<name_w$}  {}",
            plan.id,
            plan.name,
            plan.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// famaplan plan show <plan-id>
// -----------------------------------------------------------------------

async fn cmd_show(repo: &dyn PlanRepository, plan_id: &str) -> Result<()> {
    let record = find_plan(repo, plan_id).await?;

    println!("Plan: {}", record.name);
    println!("  ID:           {}", record.id);
    println!(
        "  Updated:      {}",
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    print_plan_overview(&record.data);
    Ok(())
}

/// Print the parts of a plan worth checking at a glance.
pub fn print_plan_overview(plan: &BusinessPlan) {
    let id = &plan.identificacao;
    if !id.nome_promotor.is_empty() {
        println!("  Promoter:     {}", id.nome_promotor);
    }
    if !id.nif.is_empty() {
        println!("  NIF:          {}", id.nif);
    }
    if !plan.rececao.data_rececao.is_empty() {
        println!(
            "  Received:     {} {}",
            plan.rececao.data_rececao, plan.rececao.hora_rececao
        );
    }

    let summary = plan.sumario_executivo.atividades.trim();
    if !summary.is_empty() {
        println!("  Summary:");
        for line in summary.lines().take(5) {
            println!("    {line}");
        }
        if summary.lines().count() > 5 {
            println!("    ...(truncated)");
        }
    }

    let hr = &plan.recursos_humanos;
    println!(
        "  Team:         {} member(s), {:.2}€ monthly payroll",
        hr.membros.len(),
        hr.monthly_payroll()
    );
    println!("  Investment:   {:.2}€", plan.investimento.total());
    println!("  Financing:    {:.2}€", plan.financiamento.total());

    let swot = &plan.swot;
    println!(
        "  SWOT:         {} strength(s), {} weakness(es), {} opportunit(ies), {} threat(s)",
        swot.pontos_fortes.len(),
        swot.pontos_fracos.len(),
        swot.oportunidades.len(),
        swot.ameacas.len(),
    );

    print_projections(plan);
}

/// Print the projection lines as a table, one column per year.
pub fn print_projections(plan: &BusinessPlan) {
    let lines = plan.projecoes.lines();
    let label_w = lines.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let years = lines.iter().map(|(_, v)| v.len()).max().unwrap_or(0);

    println!();
    let header: Vec<String> = (1..=years).map(|y| format!("{:>12}", format!("Year {y}"))).collect();
    println!("  {:<label_w$}{}", "", header.concat());
    for (name, values) in lines {
        let cells: Vec<String> = values.iter().map(|v| format!("{v:>12.2}")).collect();
        println!("  {name:<label_w$}{}", cells.concat());
    }
}

// -----------------------------------------------------------------------
// famaplan plan next-id
// -----------------------------------------------------------------------

async fn cmd_next_id(repo: &dyn PlanRepository) -> Result<()> {
    let id = allocate_plan_id(repo, Local::now().date_naive()).await?;
    println!("{id}");
    Ok(())
}

// -----------------------------------------------------------------------
// famaplan plan save <file>
// -----------------------------------------------------------------------

async fn cmd_save(repo: &dyn PlanRepository, file: &Path) -> Result<()> {
    let mut session = load_draft(file)?;
    let was_persisted = session.is_persisted();

    let record = save_plan(repo, &mut session, Local::now().date_naive())
        .await
        .context("failed to save plan")?;
    save_draft(file, &session)?;
    info!(id = %record.id, draft = %file.display(), "draft saved");

    if was_persisted {
        println!("Plan {} updated.", record.id);
    } else {
        println!("Plan created.");
        println!();
        println!("  Plan ID:      {}", record.id);
        println!("  Name:         {}", record.name);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// famaplan plan load <plan-id> <file>
// -----------------------------------------------------------------------

async fn cmd_load(repo: &dyn PlanRepository, plan_id: &str, file: &Path, force: bool) -> Result<()> {
    let record = find_plan(repo, plan_id).await?;
    let session = PlanSession::from_record(record);
    create_draft(file, &session, force)?;
    debug!(id = plan_id, draft = %file.display(), "plan loaded into draft");
    println!("Plan {plan_id} written to {}", file.display());
    Ok(())
}

// -----------------------------------------------------------------------
// famaplan plan delete <plan-id>
// -----------------------------------------------------------------------

async fn cmd_delete(repo: &dyn PlanRepository, plan_id: &str) -> Result<()> {
    if !repo.delete_plan(plan_id).await? {
        bail!("plan not found: {plan_id:?}");
    }
    info!(id = plan_id, "plan deleted");
    println!("Plan {plan_id} deleted.");
    Ok(())
}

async fn find_plan(repo: &dyn PlanRepository, plan_id: &str) -> Result<PlanRecord> {
    repo.get_plan(plan_id)
        .await?
        .with_context(|| format!("plan not found: {plan_id:?}"))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
