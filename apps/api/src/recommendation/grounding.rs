//! Grounding consistency checks.
//!
//! Every role reference in a repaired result must exactly match an id in the
//! grounding set supplied for that pipeline run. Non-matching references are
//! dropped, never corrected by guessing. Whether a drop is fatal (retry) or
//! survivable is decided here; re-invoking generation is the retry
//! controller's job.

use std::collections::HashSet;

use tracing::warn;

use crate::catalog::Role;
use crate::recommendation::models::{
    ConfidenceLevel, GroundedAssessment, ProjectBrief, RepairedAssessment,
};
use crate::recommendation::PipelineError;

/// Verifies every role reference in `repaired` against the grounding set.
///
/// With a non-empty grounding set, at least one adjacency must survive the
/// drop or the result is `Ungrounded` (retryable). With an empty grounding
/// set the result degrades: all matches are dropped, the assessment is forced
/// to low confidence, and `degraded` is set so callers can surface it.
pub fn enforce_grounding(
    mut repaired: RepairedAssessment,
    grounding: &[Role],
) -> Result<GroundedAssessment, PipelineError> {
    if grounding.is_empty() {
        repaired.role_matches.clear();
        repaired.confidence = ConfidenceLevel::Low;
        return Ok(GroundedAssessment {
            assessment: repaired,
            grounded_role_ids: Vec::new(),
            degraded: true,
        });
    }

    let valid_ids: HashSet<&str> = grounding.iter().map(|r| r.id.as_str()).collect();

    let mut dropped = Vec::new();
    repaired.role_matches.retain(|m| {
        if valid_ids.contains(m.role_id.as_str()) {
            true
        } else {
            dropped.push(m.role_id.clone());
            false
        }
    });

    if !dropped.is_empty() {
        warn!("Dropped ungrounded role references: {dropped:?}");
    }

    if repaired.role_matches.is_empty() {
        return Err(PipelineError::Ungrounded { dropped });
    }

    let grounded_role_ids = repaired
        .role_matches
        .iter()
        .map(|m| m.role_id.clone())
        .collect();

    Ok(GroundedAssessment {
        assessment: repaired,
        grounded_role_ids,
        degraded: false,
    })
}

/// Filters generated project briefs against the stricter brief grounding rule.
///
/// A brief survives only if its target role is in the grounding set AND, when
/// that role defines proof projects, its title equals one of them verbatim.
/// Returns the survivors and the titles of everything dropped.
pub fn filter_briefs(
    briefs: Vec<ProjectBrief>,
    grounding: &[Role],
) -> (Vec<ProjectBrief>, Vec<String>) {
    let mut kept = Vec::new();
    let mut dropped = Vec::new();

    for brief in briefs {
        let Some(role) = grounding.iter().find(|r| r.id == brief.target_role_id) else {
            dropped.push(brief.title);
            continue;
        };
        if !role.proof_projects.is_empty()
            && !role.proof_projects.iter().any(|p| p.title == brief.title)
        {
            dropped.push(brief.title);
            continue;
        }
        kept.push(brief);
    }

    if !dropped.is_empty() {
        warn!("Dropped briefs failing grounding: {dropped:?}");
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_fixtures::sample_catalog;
    use crate::recommendation::models::{Factor, PlanConfidence, PlanWindow, RoleMatch};

    fn grounding() -> Vec<Role> {
        let catalog = sample_catalog();
        catalog.roles().to_vec()
    }

    fn repaired_with_matches(matches: Vec<RoleMatch>) -> RepairedAssessment {
        RepairedAssessment {
            confidence: ConfidenceLevel::Medium,
            factors: vec![Factor {
                name: "F".to_string(),
                score: 50,
                evidence: "e".to_string(),
            }],
            role_matches: matches,
            plan: vec![PlanWindow {
                horizon: "30_days".to_string(),
                tasks: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            }],
            immediate_actions: vec!["act".to_string()],
            plan_confidence: PlanConfidence {
                level: ConfidenceLevel::Low,
                improvement_hint: "hint".to_string(),
            },
        }
    }

    fn role_match(id: &str) -> RoleMatch {
        RoleMatch {
            role_id: id.to_string(),
            rationale: "because".to_string(),
        }
    }

    #[test]
    fn test_all_grounded_references_survive() {
        let grounded = enforce_grounding(
            repaired_with_matches(vec![
                role_match("automation-analyst"),
                role_match("ops-coordinator"),
            ]),
            &grounding(),
        )
        .unwrap();
        assert_eq!(
            grounded.grounded_role_ids,
            vec!["automation-analyst", "ops-coordinator"]
        );
        assert!(!grounded.degraded);
    }

    #[test]
    fn test_ghost_reference_is_dropped_not_corrected() {
        let grounded = enforce_grounding(
            repaired_with_matches(vec![role_match("ghost-role"), role_match("ops-coordinator")]),
            &grounding(),
        )
        .unwrap();
        assert_eq!(grounded.grounded_role_ids, vec!["ops-coordinator"]);
    }

    #[test]
    fn test_only_ghost_references_is_ungrounded() {
        let result = enforce_grounding(
            repaired_with_matches(vec![role_match("ghost-role")]),
            &grounding(),
        );
        match result {
            Err(PipelineError::Ungrounded { dropped }) => {
                assert_eq!(dropped, vec!["ghost-role"]);
            }
            other => panic!("expected Ungrounded, got {other:?}"),
        }
    }

    #[test]
    fn test_no_matches_at_all_is_ungrounded() {
        let result = enforce_grounding(repaired_with_matches(vec![]), &grounding());
        assert!(matches!(result, Err(PipelineError::Ungrounded { .. })));
    }

    #[test]
    fn test_empty_grounding_degrades_to_low_confidence() {
        let grounded =
            enforce_grounding(repaired_with_matches(vec![role_match("anything")]), &[]).unwrap();
        assert!(grounded.degraded);
        assert!(grounded.grounded_role_ids.is_empty());
        assert!(grounded.assessment.role_matches.is_empty());
        assert_eq!(grounded.assessment.confidence, ConfidenceLevel::Low);
    }

    fn brief(title: &str, target: &str) -> ProjectBrief {
        ProjectBrief {
            title: title.to_string(),
            target_role_id: target.to_string(),
            summary: "s".to_string(),
            deliverables: vec![],
        }
    }

    #[test]
    fn test_brief_title_must_match_proof_project_verbatim() {
        // automation-analyst defines proof project "Invoice reconciliation bot".
        let (kept, dropped) = filter_briefs(
            vec![
                brief("Invoice reconciliation bot", "automation-analyst"),
                brief("Invoice Reconciliation Bot", "automation-analyst"), // case differs
            ],
            &grounding(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Invoice reconciliation bot");
        assert_eq!(dropped, vec!["Invoice Reconciliation Bot"]);
    }

    #[test]
    fn test_brief_for_role_without_proof_projects_keeps_any_title() {
        // ops-coordinator defines no proof projects, so titles are unconstrained.
        let (kept, dropped) =
            filter_briefs(vec![brief("Handoff map", "ops-coordinator")], &grounding());
        assert_eq!(kept.len(), 1);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_brief_targeting_ghost_role_is_dropped() {
        let (kept, dropped) = filter_briefs(vec![brief("Anything", "ghost-role")], &grounding());
        assert!(kept.is_empty());
        assert_eq!(dropped, vec!["Anything"]);
    }
}
