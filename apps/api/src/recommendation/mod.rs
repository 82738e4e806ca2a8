// Grounded recommendation pipeline.
// Flow: rank candidates → prompt build → LLM generate → parse → repair →
// grounding enforcement, with a bounded retry loop owned by the generator.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod briefs;
pub mod generator;
pub mod grounding;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod repair;

use thiserror::Error;

/// Failures internal to one pipeline attempt. The retry controller in
/// `generator` decides which of these consume retry budget; only terminal
/// mappings ever reach `AppError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed generative output. Retryable.
    #[error("generation output was not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Transport or timeout failure talking to the generative service.
    /// Folded into the same retry budget as parse failures.
    #[error("generation call failed: {0}")]
    Transport(String),

    /// Valid shape, but no grounded role references survived filtering.
    /// Retryable with the reinforced instruction.
    #[error("no grounded role references survived filtering (dropped: {dropped:?})")]
    Ungrounded { dropped: Vec<String> },

    /// No grounding roles AND no usable structured payload. Terminal:
    /// retrying cannot create grounding.
    #[error("no grounding roles and no usable structured payload")]
    NoGrounding,
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PipelineError::NoGrounding)
    }
}
