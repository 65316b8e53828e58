//! Distillation: expanding a free-text executive summary into every
//! AI-owned section of a plan.
//!
//! Results are cached under a normalized form of the summary, so repeating
//! a summary (or a variant differing only in case or spacing) returns the
//! stored payload without calling the generator again. Nothing is cached
//! when generation fails, and a plan is only touched once a payload has
//! been fully validated.

pub mod cache;
pub mod payload;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use cache::{MemorySummaryCache, PgSummaryCache, SummaryCache};
pub use payload::{SectionPayload, distillation_schema};

use crate::generator::{GenerateRequest, Generator, GeneratorError, ModelTier};
use crate::plan::session::{PlanPatch, PlanSession};
use crate::schema::{ContentError, parse_structured};

/// Sampling temperature for distillation. Results are cached, so the
/// request asks for a stable answer rather than a creative one.
pub const DISTILL_TEMPERATURE: f64 = 0.2;

// ---------------------------------------------------------------------------
// Summary text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("executive summary is empty")]
pub struct EmptySummary;

/// A non-blank executive summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary(String);

impl Summary {
    pub fn new(text: impl Into<String>) -> Result<Self, EmptySummary> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(EmptySummary);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key this summary is cached under.
    pub fn cache_key(&self) -> String {
        normalize_summary_key(&self.0)
    }
}

/// Trim, lowercase and replace each run of whitespace with one `_`.
pub fn normalize_summary_key(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DistillError {
    #[error("distillation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("distillation failed: {0}")]
    Content(#[from] ContentError),
}

#[derive(Debug, Error)]
pub enum PopulateError {
    #[error("cannot populate the plan: {0}")]
    EmptySummary(#[from] EmptySummary),

    #[error(transparent)]
    Distill(#[from] DistillError),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn distill_prompt(summary: &Summary) -> String {
    format!(
        "Atua como consultor de estratégia sénior. A partir do sumário executivo abaixo, \
         preenche todas as restantes secções do plano de negócios: análise de mercado, \
         projeto, recursos humanos, estratégia, análise SWOT, investimento, financiamento \
         e projeções a 3 anos.\n\
         Responde apenas com JSON, em Português de Portugal. \
         Contexto: Vila Nova de Famalicão.\n\n\
         Sumário executivo:\n\"{}\"",
        summary.as_str()
    )
}

/// Turns summaries into section payloads through a cache and a generator.
pub struct DistillationPipeline {
    generator: Arc<dyn Generator>,
    cache: Arc<dyn SummaryCache>,
    /// Held from cache lookup to cache store. Every distillation on this
    /// pipeline waits for it, whatever its key, so at most one generation is
    /// in flight per pipeline.
    in_flight: Mutex<()>,
}

impl DistillationPipeline {
    pub fn new(generator: Arc<dyn Generator>, cache: Arc<dyn SummaryCache>) -> Self {
        Self {
            generator,
            cache,
            in_flight: Mutex::new(()),
        }
    }

    /// Return the section payload for `summary`, generating it on a miss.
    pub async fn distill(&self, summary: &Summary) -> Result<SectionPayload, DistillError> {
        let key = summary.cache_key();
        let _guard = self.in_flight.lock().await;

        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                debug!(%key, "distillation cache hit");
                return Ok(payload);
            }
            Ok(None) => debug!(%key, "distillation cache miss"),
            Err(e) => warn!(%key, error = %e, "cache lookup failed, generating anyway"),
        }

        let schema = distillation_schema();
        let request = GenerateRequest::structured(
            distill_prompt(summary),
            schema.clone(),
            DISTILL_TEMPERATURE,
            ModelTier::Pro,
        );
        let text = self.generator.generate(&request).await?;
        let value = parse_structured(&text, &schema)?;
        let payload: SectionPayload = serde_json::from_value(value).map_err(ContentError::Json)?;
        payload.check()?;

        if let Err(e) = self.cache.put(&key, &payload).await {
            warn!(%key, error = %e, "failed to store distillation result");
        }
        info!(%key, generator = self.generator.name(), "distilled summary");
        Ok(payload)
    }

    /// Distill the session's executive summary and merge the result.
    ///
    /// On any error the session is left exactly as it was.
    pub async fn populate(&self, session: &mut PlanSession) -> Result<(), PopulateError> {
        let summary = Summary::new(session.plan().sumario_executivo.atividades.clone())?;
        let payload = self.distill(&summary).await?;
        session.apply(PlanPatch::Distilled(payload));
        Ok(())
    }
}
