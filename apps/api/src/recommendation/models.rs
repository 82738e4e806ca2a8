//! Result stages for the assessment pipeline.
//!
//! Generative output moves through three distinct types: `RawAssessment`
//! (untrusted, every field optional) → `RepairedAssessment` (structurally
//! complete) → `GroundedAssessment` (every role reference verified against the
//! grounding set). Each stage has exactly one producer, so a value cannot
//! silently skip a validation step.

use serde::{Deserialize, Serialize};

/// Confidence levels the generator may claim for an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

// ────────────────────────────────────────────────────────────────────────────
// Raw stage — untrusted serde targets, lenient on every field
// ────────────────────────────────────────────────────────────────────────────

/// Untrusted parse target for the generator's JSON. Anything may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssessment {
    #[serde(default)]
    pub confidence: Option<ConfidenceLevel>,
    #[serde(default)]
    pub factors: Vec<RawFactor>,
    #[serde(default)]
    pub role_matches: Vec<RawRoleMatch>,
    #[serde(default)]
    pub plan: Vec<RawPlanWindow>,
    #[serde(default)]
    pub immediate_actions: Vec<String>,
    #[serde(default)]
    pub plan_confidence: Option<RawPlanConfidence>,
}

impl RawAssessment {
    /// True when the payload carries nothing repair could work with.
    /// Combined with an empty grounding set this is unrecoverable.
    pub fn is_structurally_empty(&self) -> bool {
        self.factors.is_empty()
            && self.role_matches.is_empty()
            && self.plan.is_empty()
            && self.immediate_actions.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFactor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRoleMatch {
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlanWindow {
    #[serde(default)]
    pub horizon: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlanConfidence {
    #[serde(default)]
    pub level: Option<ConfidenceLevel>,
    #[serde(default)]
    pub improvement_hint: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Repaired stage — structurally complete, produced only by repair::repair
// ────────────────────────────────────────────────────────────────────────────

/// One scored factor in the assessment breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub score: u32,
    pub evidence: String,
}

/// A role adjacency claimed by the generator. Verified (or dropped) by the
/// grounding checker, never corrected by guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMatch {
    pub role_id: String,
    pub rationale: String,
}

/// One horizon of the action plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanWindow {
    pub horizon: String,
    pub tasks: Vec<String>,
}

/// Secondary confidence on the plan itself, distinct from the assessment
/// confidence. Absence in the raw output signals uncertainty, so the default
/// is "low" plus a hint, never an asserted "medium".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfidence {
    pub level: ConfidenceLevel,
    pub improvement_hint: String,
}

/// Structurally complete assessment. Field names round-trip through
/// `RawAssessment`, which is what makes repair idempotence testable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairedAssessment {
    pub confidence: ConfidenceLevel,
    pub factors: Vec<Factor>,
    pub role_matches: Vec<RoleMatch>,
    pub plan: Vec<PlanWindow>,
    pub immediate_actions: Vec<String>,
    pub plan_confidence: PlanConfidence,
}

// ────────────────────────────────────────────────────────────────────────────
// Grounded stage — produced only by grounding::enforce_grounding
// ────────────────────────────────────────────────────────────────────────────

/// An assessment whose every role reference exists in the grounding set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundedAssessment {
    #[serde(flatten)]
    pub assessment: RepairedAssessment,
    /// Role ids the surviving references were verified against.
    pub grounded_role_ids: Vec<String>,
    /// True when the grounding set was empty and the result degraded to
    /// generic fallbacks. Degraded results are forced to low confidence.
    pub degraded: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Project-brief variant
// ────────────────────────────────────────────────────────────────────────────

/// Untrusted parse target for one generated project brief.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBrief {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub target_role_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub deliverables: Vec<String>,
}

/// A validated project brief. When the target role defines proof projects,
/// `title` is verbatim one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectBrief {
    pub title: String,
    pub target_role_id: String,
    pub summary: String,
    pub deliverables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_assessment_parses_with_everything_missing() {
        let raw: RawAssessment = serde_json::from_str("{}").unwrap();
        assert!(raw.is_structurally_empty());
        assert!(raw.confidence.is_none());
    }

    #[test]
    fn test_raw_assessment_with_any_list_is_not_empty() {
        let raw: RawAssessment =
            serde_json::from_str(r#"{"immediate_actions": ["update resume"]}"#).unwrap();
        assert!(!raw.is_structurally_empty());
    }

    #[test]
    fn test_confidence_levels_use_lowercase_wire_format() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::Medium).unwrap(),
            r#""medium""#
        );
        let level: ConfidenceLevel = serde_json::from_str(r#""low""#).unwrap();
        assert_eq!(level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_unknown_confidence_is_a_parse_error() {
        let result: Result<ConfidenceLevel, _> = serde_json::from_str(r#""certain""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_repaired_assessment_round_trips_through_raw() {
        let repaired = RepairedAssessment {
            confidence: ConfidenceLevel::Medium,
            factors: vec![Factor {
                name: "Skill alignment".to_string(),
                score: 70,
                evidence: "Excel overlap".to_string(),
            }],
            role_matches: vec![RoleMatch {
                role_id: "automation-analyst".to_string(),
                rationale: "direct skill carryover".to_string(),
            }],
            plan: vec![PlanWindow {
                horizon: "30_days".to_string(),
                tasks: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            }],
            immediate_actions: vec!["update resume".to_string()],
            plan_confidence: PlanConfidence {
                level: ConfidenceLevel::Low,
                improvement_hint: "add more detail".to_string(),
            },
        };

        let json = serde_json::to_string(&repaired).unwrap();
        let raw: RawAssessment = serde_json::from_str(&json).unwrap();
        assert_eq!(raw.factors.len(), 1);
        assert_eq!(raw.plan[0].tasks.len(), 3);
        assert_eq!(raw.confidence, Some(ConfidenceLevel::Medium));
    }
}
