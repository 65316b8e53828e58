//! CLI handlers for the generator-backed commands.
//!
//! Implements:
//! - `famaplan distill <file>`              -- fill the AI-owned sections from the summary
//! - `famaplan assist --section <t> <notes>` -- draft text for one section
//! - `famaplan strategy <file>`             -- regenerate the strategy section
//! - `famaplan projections <file>`          -- regenerate the three-year projections

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use famaplan_core::assist::{assist_writing, generate_projections, generate_strategy};
use famaplan_core::distill::{DistillationPipeline, Summary};
use famaplan_core::generator::{GeminiGenerator, Generator};
use famaplan_core::plan::PlanPatch;

use crate::config::FamaplanConfig;
use crate::draft::{load_draft, save_draft};
use crate::plan_cmds::{print_plan_overview, print_projections};

/// Build the configured generator, failing when no API key is available.
pub fn build_generator(config: &FamaplanConfig) -> Result<Arc<dyn Generator>> {
    let gemini = config.require_gemini()?.clone();
    debug!(model = %gemini.model, fast_model = %gemini.fast_model, "using Gemini generator");
    let generator = GeminiGenerator::new(gemini).context("failed to build generator client")?;
    Ok(Arc::new(generator))
}

// -----------------------------------------------------------------------
// famaplan distill <file>
// -----------------------------------------------------------------------

pub async fn cmd_distill(pipeline: &DistillationPipeline, file: &Path) -> Result<()> {
    let mut session = load_draft(file)?;
    pipeline
        .populate(&mut session)
        .await
        .context("failed to distill executive summary")?;
    save_draft(file, &session)?;
    info!(draft = %file.display(), "draft populated from executive summary");

    println!("Sections filled from the executive summary:");
    print_plan_overview(session.plan());
    println!();
    println!("Review the draft, then run `famaplan plan save {}`.", file.display());
    Ok(())
}

// -----------------------------------------------------------------------
// famaplan assist --section <title> <notes>
// -----------------------------------------------------------------------

pub async fn cmd_assist(generator: &dyn Generator, section: &str, notes: &str) -> Result<()> {
    let text = assist_writing(generator, section, notes)
        .await
        .with_context(|| format!("failed to draft text for {section:?}"))?;
    println!("{text}");
    Ok(())
}

// -----------------------------------------------------------------------
// famaplan strategy <file>
// -----------------------------------------------------------------------

pub async fn cmd_strategy(generator: &dyn Generator, file: &Path) -> Result<()> {
    let mut session = load_draft(file)?;
    let summary = Summary::new(session.plan().sumario_executivo.atividades.clone())?;

    let strategy = generate_strategy(generator, summary.as_str())
        .await
        .context("failed to generate strategy")?;
    session.apply(PlanPatch::Strategy(strategy));
    save_draft(file, &session)?;
    info!(draft = %file.display(), "strategy regenerated");

    let s = &session.plan().estrategia;
    println!("Strategy updated.");
    println!("  Rationale:    {}", s.fundamentacao);
    println!("  Product:      {}", s.produto);
    println!("  Price:        {}", s.preco);
    println!("  Distribution: {}", s.distribuicao);
    println!("  Promotion:    {}", s.comunicacao);
    Ok(())
}

// -----------------------------------------------------------------------
// famaplan projections <file>
// -----------------------------------------------------------------------

pub async fn cmd_projections(generator: &dyn Generator, file: &Path) -> Result<()> {
    let mut session = load_draft(file)?;
    let projections = generate_projections(generator, session.plan())
        .await
        .context("failed to generate projections")?;
    session.apply(PlanPatch::Projections(projections));
    save_draft(file, &session)?;
    info!(draft = %file.display(), "projections regenerated");

    println!("Projections updated.");
    print_projections(session.plan());
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
