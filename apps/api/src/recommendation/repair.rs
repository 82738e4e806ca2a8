//! Structural repair of generative output.
//!
//! Repair recovers *structural* incompleteness locally and never escalates a
//! missing field as an error. Two hard rules hold for every step:
//!
//!   1. Idempotent: repairing an already-repaired assessment is a no-op.
//!   2. Grounding-only: backfilled text comes from the raw result, the
//!      grounding roles (starter-plan tasks, proof-project titles), or a fixed
//!      placeholder constant. Never synthesized prose.
//!
//! The only error this module raises is the unrecoverable case: an empty
//! grounding set combined with a structurally empty payload.

use crate::catalog::Role;
use crate::recommendation::models::{
    ConfidenceLevel, Factor, PlanConfidence, PlanWindow, RawAssessment, RepairedAssessment,
    RoleMatch,
};
use crate::recommendation::PipelineError;

/// Minimum factor entries the downstream UI contract expects.
pub const MIN_FACTORS: usize = 5;
/// Neutral score assigned to synthesized placeholder factors.
pub const PLACEHOLDER_FACTOR_SCORE: u32 = 50;
/// Fixed plan horizons; every repaired plan has exactly one window per label.
pub const PLAN_HORIZONS: [&str; 3] = ["30_days", "60_days", "90_days"];
/// Every repaired plan window carries at least this many tasks.
pub const MIN_WINDOW_TASKS: usize = 3;
/// Backfilled task lists are truncated to this many entries.
pub const MAX_WINDOW_TASKS: usize = 5;

const PLACEHOLDER_FACTOR_EVIDENCE: &str =
    "Not assessed by the generator; neutral placeholder entry.";
const DEFAULT_IMPROVEMENT_HINT: &str =
    "Add more detail about your skills and experience to sharpen this plan.";
/// Degraded fallback tasks used when no grounding role exists. Fixed text,
/// clearly pointing the user at the missing prerequisite.
const NO_GROUNDING_TASKS: [&str; 3] = [
    "Define your target role before acting on this plan",
    "List the skills your target role requires",
    "Compare your current skills against that list",
];

/// Strict parse of the raw generative text. Parse failure is surfaced to the
/// retry controller, never retried here.
pub fn parse_assessment(raw_text: &str) -> Result<RawAssessment, PipelineError> {
    Ok(serde_json::from_str(raw_text)?)
}

/// The pool of text repair may backfill from: the top-ranked grounding role's
/// starter-plan tasks, then its proof-project titles, in that order.
fn backfill_pool(grounding: &[Role]) -> Vec<String> {
    let Some(top) = grounding.first() else {
        return Vec::new();
    };
    let mut pool = top.starter_plan.clone();
    pool.extend(top.proof_projects.iter().map(|p| p.title.clone()));
    pool
}

/// Repairs a raw assessment into a structurally complete one.
///
/// `grounding` is the ranked candidate list; only the top role is used as a
/// backfill source. Errs with `NoGrounding` only when the grounding set is
/// empty AND the payload is structurally empty.
pub fn repair(
    raw: RawAssessment,
    grounding: &[Role],
) -> Result<RepairedAssessment, PipelineError> {
    if grounding.is_empty() && raw.is_structurally_empty() {
        return Err(PipelineError::NoGrounding);
    }

    let pool = backfill_pool(grounding);

    // Scalar default: a missing confidence is neutral, never inferred.
    let confidence = raw.confidence.unwrap_or(ConfidenceLevel::Medium);

    let factors = repair_factors(raw.factors);
    let plan = repair_plan(raw.plan, &pool);
    let immediate_actions = repair_immediate_actions(raw.immediate_actions, &pool);

    // Role matches pass through with defaults filled; grounding is the next
    // stage's job, not repair's.
    let role_matches = raw
        .role_matches
        .into_iter()
        .filter_map(|m| {
            m.role_id.map(|role_id| RoleMatch {
                role_id,
                rationale: m.rationale.unwrap_or_default(),
            })
        })
        .collect();

    // Missing secondary confidence signals uncertainty: default low, with a
    // hint, rather than asserting false confidence.
    let plan_confidence = match raw.plan_confidence {
        Some(pc) => PlanConfidence {
            level: pc.level.unwrap_or(ConfidenceLevel::Low),
            improvement_hint: pc
                .improvement_hint
                .unwrap_or_else(|| DEFAULT_IMPROVEMENT_HINT.to_string()),
        },
        None => PlanConfidence {
            level: ConfidenceLevel::Low,
            improvement_hint: DEFAULT_IMPROVEMENT_HINT.to_string(),
        },
    };

    Ok(RepairedAssessment {
        confidence,
        factors,
        role_matches,
        plan,
        immediate_actions,
        plan_confidence,
    })
}

/// Drops unusable factor entries, fills per-field defaults, and tops the list
/// up to `MIN_FACTORS` with clearly-labeled neutral placeholders.
fn repair_factors(raw: Vec<crate::recommendation::models::RawFactor>) -> Vec<Factor> {
    let mut factors: Vec<Factor> = raw
        .into_iter()
        .filter_map(|f| {
            // A factor with no name carries no usable label; dropping it is
            // not inventing.
            f.name.map(|name| Factor {
                name,
                score: f.score.unwrap_or(PLACEHOLDER_FACTOR_SCORE).min(100),
                evidence: f
                    .evidence
                    .unwrap_or_else(|| PLACEHOLDER_FACTOR_EVIDENCE.to_string()),
            })
        })
        .collect();

    let mut next = factors.len() + 1;
    while factors.len() < MIN_FACTORS {
        factors.push(Factor {
            name: format!("Additional factor {next}"),
            score: PLACEHOLDER_FACTOR_SCORE,
            evidence: PLACEHOLDER_FACTOR_EVIDENCE.to_string(),
        });
        next += 1;
    }
    factors
}

/// Rebuilds the plan so each horizon appears exactly once, in fixed order.
/// Missing windows are backfilled from the grounding pool (truncated to
/// `MAX_WINDOW_TASKS`); short windows are topped up to `MIN_WINDOW_TASKS`.
fn repair_plan(
    raw: Vec<crate::recommendation::models::RawPlanWindow>,
    pool: &[String],
) -> Vec<PlanWindow> {
    PLAN_HORIZONS
        .iter()
        .map(|&horizon| {
            // First occurrence wins; duplicate windows are dropped.
            let mut tasks = raw
                .iter()
                .find(|w| w.horizon.as_deref() == Some(horizon))
                .map(|w| w.tasks.clone())
                .unwrap_or_else(|| {
                    pool.iter().take(MAX_WINDOW_TASKS).cloned().collect()
                });
            top_up_tasks(&mut tasks, pool);
            PlanWindow {
                horizon: horizon.to_string(),
                tasks,
            }
        })
        .collect()
}

/// Tops a task list up to `MIN_WINDOW_TASKS`, first from the grounding pool,
/// then from the fixed no-grounding placeholders. Never duplicates an entry.
fn top_up_tasks(tasks: &mut Vec<String>, pool: &[String]) {
    for candidate in pool {
        if tasks.len() >= MIN_WINDOW_TASKS {
            return;
        }
        if !tasks.contains(candidate) {
            tasks.push(candidate.clone());
        }
    }
    for placeholder in NO_GROUNDING_TASKS {
        if tasks.len() >= MIN_WINDOW_TASKS {
            return;
        }
        if !tasks.iter().any(|t| t == placeholder) {
            tasks.push(placeholder.to_string());
        }
    }
}

/// Backfills an empty immediate-action list from the grounding pool, or the
/// fixed placeholders when no grounding role exists.
fn repair_immediate_actions(actions: Vec<String>, pool: &[String]) -> Vec<String> {
    if !actions.is_empty() {
        return actions;
    }
    if pool.is_empty() {
        return NO_GROUNDING_TASKS.iter().map(|s| s.to_string()).collect();
    }
    pool.iter().take(MAX_WINDOW_TASKS).cloned().collect()
}
