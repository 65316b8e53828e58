//! Text generation backends.
//!
//! The distillation pipeline and the writing aids talk to a [`Generator`]
//! trait object so the remote model can be swapped for a scripted fake in
//! tests.

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use gemini::{GeminiConfig, GeminiGenerator};

/// Which class of model a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Larger model for structured, multi-section output.
    Pro,
    /// Faster model for short rewrites.
    Flash,
}

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// When set, the generator is asked to answer with JSON of this shape.
    pub response_schema: Option<Value>,
    pub temperature: f64,
    pub tier: ModelTier,
}

impl GenerateRequest {
    /// A free-text request.
    pub fn text(prompt: impl Into<String>, temperature: f64, tier: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
            temperature,
            tier,
        }
    }

    /// A request for JSON following `schema`.
    pub fn structured(
        prompt: impl Into<String>,
        schema: Value,
        temperature: f64,
        tier: ModelTier,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: Some(schema),
            temperature,
            tier,
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("generator API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("generation blocked: {0}")]
    Blocked(String),

    #[error("generator returned an empty response")]
    EmptyResponse,

    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

/// A backend that turns a prompt into text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short name for logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Run one request and return the raw response text.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, GeneratorError>;
}
