//! Project-brief generation — the stricter variant of the grounding pipeline.
//!
//! Briefs must target a grounding role, and when that role defines proof
//! projects the brief title must be one of them verbatim. Briefs failing the
//! check are excluded entirely; an empty surviving set consumes retry budget
//! and is terminal once the budget runs out, never a silent fallback.

use serde_json::json;
use tracing::{info, warn};

use crate::catalog::Role;
use crate::errors::AppError;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, REINFORCED_GROUNDING_INSTRUCTION};
use crate::matching::scorer::ScoredRole;
use crate::matching::UserProfile;
use crate::recommendation::generator::{AssessmentGenerator, GenerationOptions};
use crate::recommendation::grounding::filter_briefs;
use crate::recommendation::models::{ProjectBrief, RawBrief};
use crate::recommendation::prompts::{BRIEFS_PROMPT_TEMPLATE, BRIEFS_SYSTEM};
use crate::recommendation::PipelineError;

/// A successfully grounded brief run.
#[derive(Debug)]
pub struct BriefsOutcome {
    pub briefs: Vec<ProjectBrief>,
    pub attempts: u32,
}

/// Generates project briefs with the bounded retry loop. Unlike the
/// assessment pipeline there is no degraded mode: a brief without a target
/// role is meaningless, so an empty grounding set is terminal up front.
pub async fn generate_briefs(
    generator: &dyn AssessmentGenerator,
    profile: &UserProfile,
    candidates: &[ScoredRole],
    options: &GenerationOptions,
) -> Result<BriefsOutcome, AppError> {
    if candidates.is_empty() {
        return Err(AppError::NoGrounding);
    }

    let grounding: Vec<Role> = candidates.iter().map(|c| c.role.clone()).collect();
    let prompt = build_briefs_prompt(profile, candidates)?;

    let mut last_failure: Option<PipelineError> = None;

    for attempt in 0..=options.max_retries {
        let system = if attempt == 0 {
            BRIEFS_SYSTEM.to_string()
        } else {
            format!("{BRIEFS_SYSTEM}\n\n{REINFORCED_GROUNDING_INSTRUCTION}")
        };

        match run_attempt(generator, &system, &prompt, &grounding, options).await {
            Ok(briefs) => {
                info!(
                    "Briefs grounded on attempt {}/{} ({} briefs)",
                    attempt + 1,
                    options.max_retries + 1,
                    briefs.len()
                );
                return Ok(BriefsOutcome {
                    briefs,
                    attempts: attempt + 1,
                });
            }
            Err(failure) => {
                warn!(
                    "Brief attempt {}/{} failed: {failure}",
                    attempt + 1,
                    options.max_retries + 1
                );
                last_failure = Some(failure);
            }
        }
    }

    let attempts = options.max_retries + 1;
    Err(match last_failure {
        Some(PipelineError::Ungrounded { .. }) => AppError::GroundingFailed { attempts },
        _ => AppError::GenerationUnparseable { attempts },
    })
}

async fn run_attempt(
    generator: &dyn AssessmentGenerator,
    system: &str,
    prompt: &str,
    grounding: &[Role],
    options: &GenerationOptions,
) -> Result<Vec<ProjectBrief>, PipelineError> {
    let raw_text = tokio::time::timeout(options.llm_timeout, generator.generate_raw(system, prompt))
        .await
        .map_err(|_| {
            PipelineError::Transport(format!(
                "brief generation timed out after {:?}",
                options.llm_timeout
            ))
        })?
        .map_err(|e| PipelineError::Transport(e.to_string()))?;

    let raw: Vec<RawBrief> = serde_json::from_str(&raw_text)?;

    // A brief missing its title or target carries nothing checkable; drop it.
    let parsed: Vec<ProjectBrief> = raw
        .into_iter()
        .filter_map(|b| match (b.title, b.target_role_id) {
            (Some(title), Some(target_role_id)) => Some(ProjectBrief {
                title,
                target_role_id,
                summary: b.summary.unwrap_or_default(),
                deliverables: b.deliverables,
            }),
            _ => None,
        })
        .collect();

    let (kept, dropped) = filter_briefs(parsed, grounding);
    if kept.is_empty() {
        return Err(PipelineError::Ungrounded { dropped });
    }
    Ok(kept)
}

/// Fills the brief prompt template with the profile and candidate roles.
fn build_briefs_prompt(
    profile: &UserProfile,
    candidates: &[ScoredRole],
) -> Result<String, AppError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;

    let candidates_json = serde_json::to_string_pretty(
        &candidates
            .iter()
            .map(|c| {
                json!({
                    "role_id": c.role.id,
                    "title": c.role.title,
                    "summary": c.role.summary,
                    "proof_projects": c.role.proof_projects,
                })
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize candidates: {e}")))?;

    Ok(BRIEFS_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{profile_json}", &profile_json)
        .replace("{candidates_json}", &candidates_json))
}
