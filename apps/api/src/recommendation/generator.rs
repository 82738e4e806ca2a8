//! Assessment generation — the retry controller that owns the generation loop.
//!
//! The retry budget is an explicit bounded loop with the attempt counter in
//! scope, not hidden recursion. This module is the only place permitted to
//! re-invoke generation. Parse failures, transport failures, and ungrounded
//! results all consume the same budget; exceeding it is a terminal error
//! surfaced to the caller, never a silently ungrounded result.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::catalog::Role;
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, REINFORCED_GROUNDING_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};
use crate::matching::scorer::ScoredRole;
use crate::matching::UserProfile;
use crate::recommendation::grounding::enforce_grounding;
use crate::recommendation::models::GroundedAssessment;
use crate::recommendation::prompts::{ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_SYSTEM};
use crate::recommendation::repair::{parse_assessment, repair};
use crate::recommendation::PipelineError;

/// The generative backend seam. The production impl is `LlmClient`; tests
/// script it. Implementations return raw text — parsing and validation stay
/// in the pipeline.
#[async_trait]
pub trait AssessmentGenerator: Send + Sync {
    async fn generate_raw(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl AssessmentGenerator for LlmClient {
    async fn generate_raw(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.call_text(prompt, system).await
    }
}

/// Retry/timeout policy for one pipeline run.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Re-invocations allowed after the first attempt.
    pub max_retries: u32,
    /// Timeout for each individual generation call.
    pub llm_timeout: Duration,
}

impl GenerationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_grounding_retries,
            llm_timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

/// A successfully grounded pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub assessment: GroundedAssessment,
    /// Total generation attempts spent, including the successful one.
    pub attempts: u32,
}

/// Runs generate → parse → repair → enforce-grounding with the bounded retry
/// loop. Retries re-invoke the generator with the reinforced grounding
/// instruction appended to the system prompt.
pub async fn generate_assessment(
    generator: &dyn AssessmentGenerator,
    profile: &UserProfile,
    candidates: &[ScoredRole],
    options: &GenerationOptions,
) -> Result<PipelineOutcome, AppError> {
    let grounding: Vec<Role> = candidates.iter().map(|c| c.role.clone()).collect();
    let prompt = build_assessment_prompt(profile, candidates)?;

    let mut last_failure: Option<PipelineError> = None;

    for attempt in 0..=options.max_retries {
        let system = if attempt == 0 {
            ASSESSMENT_SYSTEM.to_string()
        } else {
            format!("{ASSESSMENT_SYSTEM}\n\n{REINFORCED_GROUNDING_INSTRUCTION}")
        };

        match run_attempt(generator, &system, &prompt, &grounding, options.llm_timeout).await {
            Ok(assessment) => {
                info!(
                    "Assessment grounded on attempt {}/{} ({} role refs)",
                    attempt + 1,
                    options.max_retries + 1,
                    assessment.grounded_role_ids.len()
                );
                return Ok(PipelineOutcome {
                    assessment,
                    attempts: attempt + 1,
                });
            }
            Err(failure) if failure.is_retryable() => {
                warn!(
                    "Generation attempt {}/{} failed: {failure}",
                    attempt + 1,
                    options.max_retries + 1
                );
                last_failure = Some(failure);
            }
            Err(failure) => return Err(terminal_error(failure, attempt + 1)),
        }
    }

    let attempts = options.max_retries + 1;
    Err(terminal_error(
        last_failure.unwrap_or(PipelineError::Transport("no attempts ran".to_string())),
        attempts,
    ))
}

/// One attempt: call with timeout, parse, repair, enforce grounding.
async fn run_attempt(
    generator: &dyn AssessmentGenerator,
    system: &str,
    prompt: &str,
    grounding: &[Role],
    timeout: Duration,
) -> Result<GroundedAssessment, PipelineError> {
    let raw_text = tokio::time::timeout(timeout, generator.generate_raw(system, prompt))
        .await
        .map_err(|_| {
            PipelineError::Transport(format!("generation timed out after {timeout:?}"))
        })?
        .map_err(|e| PipelineError::Transport(e.to_string()))?;

    let raw = parse_assessment(&raw_text)?;
    let repaired = repair(raw, grounding)?;
    enforce_grounding(repaired, grounding)
}

/// Maps an exhausted or unrecoverable pipeline failure to its boundary error.
fn terminal_error(failure: PipelineError, attempts: u32) -> AppError {
    match failure {
        PipelineError::NoGrounding => AppError::NoGrounding,
        PipelineError::Ungrounded { .. } => AppError::GroundingFailed { attempts },
        PipelineError::Parse(_) | PipelineError::Transport(_) => {
            AppError::GenerationUnparseable { attempts }
        }
    }
}

/// Fills the assessment prompt template with the profile and candidate roles.
pub fn build_assessment_prompt(
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
                    "core_skills": c.role.core_skills,
                    "starter_plan": c.role.starter_plan,
                    "proof_projects": c.role.proof_projects,
                    "match_score": c.score,
                })
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize candidates: {e}")))?;

    Ok(ASSESSMENT_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{profile_json}", &profile_json)
        .replace("{candidates_json}", &candidates_json))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted generator: pops one canned response per call and records the
    /// system prompts it was invoked with.
    pub struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        pub systems_seen: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                systems_seen: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.systems_seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AssessmentGenerator for ScriptedGenerator {
        async fn generate_raw(&self, system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.systems_seen.lock().unwrap().push(system.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedGenerator;
    use super::*;
    use crate::catalog::test_fixtures::sample_catalog;
    use crate::matching::scorer::ScoredRole;

    fn candidates() -> Vec<ScoredRole> {
        sample_catalog()
            .roles()
            .iter()
            .map(|role| ScoredRole {
                role: role.clone(),
                score: 10,
            })
            .collect()
    }

    fn profile() -> UserProfile {
        UserProfile {
            job_title: "Data Entry Clerk".to_string(),
            industry: "Finance".to_string(),
            skills: vec!["Excel".to_string()],
            years_experience: Some(2),
            interests: vec![],
            goal: None,
        }
    }

    fn options(max_retries: u32) -> GenerationOptions {
        GenerationOptions {
            max_retries,
            llm_timeout: Duration::from_secs(120),
        }
    }

    fn grounded_json(role_id: &str) -> String {
        format!(
            r#"{{"confidence": "high",
                "factors": [{{"name": "F", "score": 70, "evidence": "e"}}],
                "role_matches": [{{"role_id": "{role_id}", "rationale": "fit"}}],
                "plan": [{{"horizon": "30_days", "tasks": ["a", "b", "c"]}}],
                "immediate_actions": ["act"]}}"#
        )
    }

    #[tokio::test]
    async fn test_grounded_first_attempt_succeeds() {
        let generator = ScriptedGenerator::new(vec![Ok(grounded_json("automation-analyst"))]);
        let outcome = generate_assessment(&generator, &profile(), &candidates(), &options(2))
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.assessment.grounded_role_ids, vec!["automation-analyst"]);
        assert!(!outcome.assessment.degraded);
        // Repair ran: factor list topped up, all horizons present.
        assert_eq!(outcome.assessment.assessment.factors.len(), 5);
        assert_eq!(outcome.assessment.assessment.plan.len(), 3);
    }

    #[tokio::test]
    async fn test_ghost_reference_retries_with_reinforced_instruction() {
        let generator = ScriptedGenerator::new(vec![
            Ok(grounded_json("ghost-role")),
            Ok(grounded_json("ops-coordinator")),
        ]);
        let outcome = generate_assessment(&generator, &profile(), &candidates(), &options(2))
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.assessment.grounded_role_ids, vec!["ops-coordinator"]);

        let systems = generator.systems_seen.lock().unwrap();
        assert!(!systems[0].contains("PREVIOUS ANSWER WAS REJECTED"));
        assert!(systems[1].contains("PREVIOUS ANSWER WAS REJECTED"));
    }

    #[tokio::test]
    async fn test_persistent_ghost_reference_is_grounding_failure() {
        // Ghost reference as the only adjacency: one retry, then terminal.
        let generator = ScriptedGenerator::new(vec![
            Ok(grounded_json("ghost-role")),
            Ok(grounded_json("ghost-role")),
        ]);
        let err = generate_assessment(&generator, &profile(), &candidates(), &options(1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GroundingFailed { attempts: 2 }));
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_persistent_parse_failure_is_unparseable() {
        let generator = ScriptedGenerator::new(vec![
            Ok("definitely not json".to_string()),
            Ok("still not json".to_string()),
            Ok("{broken".to_string()),
        ]);
        let err = generate_assessment(&generator, &profile(), &candidates(), &options(2))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GenerationUnparseable { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_parse_failure_then_success_recovers() {
        let generator = ScriptedGenerator::new(vec![
            Ok("oops".to_string()),
            Ok(grounded_json("automation-analyst")),
        ]);
        let outcome = generate_assessment(&generator, &profile(), &candidates(), &options(2))
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_transport_failure_consumes_same_budget() {
        let generator = ScriptedGenerator::new(vec![
            Err(LlmError::RateLimited { retries: 3 }),
            Ok(grounded_json("automation-analyst")),
        ]);
        let outcome = generate_assessment(&generator, &profile(), &candidates(), &options(2))
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_empty_grounding_and_empty_payload_fails_without_retry() {
        let generator =
            ScriptedGenerator::new(vec![Ok("{}".to_string()), Ok("{}".to_string())]);
        let err = generate_assessment(&generator, &profile(), &[], &options(2))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NoGrounding));
        assert_eq!(generator.calls(), 1, "terminal failure must not retry");
    }

    #[tokio::test]
    async fn test_empty_grounding_with_payload_degrades() {
        let generator = ScriptedGenerator::new(vec![Ok(grounded_json("anything"))]);
        let outcome = generate_assessment(&generator, &profile(), &[], &options(2))
            .await
            .unwrap();

        assert!(outcome.assessment.degraded);
        assert!(outcome.assessment.grounded_role_ids.is_empty());
        assert_eq!(
            outcome.assessment.assessment.confidence,
            crate::recommendation::models::ConfidenceLevel::Low
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generation_times_out_and_retries() {
        struct SlowThenFast;

        #[async_trait]
        impl AssessmentGenerator for SlowThenFast {
            async fn generate_raw(&self, system: &str, _: &str) -> Result<String, LlmError> {
                if system.contains("PREVIOUS ANSWER WAS REJECTED") {
                    Ok(grounded_json("automation-analyst"))
                } else {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    Ok("too late".to_string())
                }
            }
        }

        let options = GenerationOptions {
            max_retries: 1,
            llm_timeout: Duration::from_secs(30),
        };
        let outcome = generate_assessment(&SlowThenFast, &profile(), &candidates(), &options)
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 2);
    }

    #[test]
    fn test_prompt_embeds_grounding_instruction_and_role_ids() {
        let prompt = build_assessment_prompt(&profile(), &candidates()).unwrap();
        assert!(prompt.contains("automation-analyst"));
        assert!(prompt.contains("CRITICAL"));
        assert!(prompt.contains("Data Entry Clerk"));
    }
}
