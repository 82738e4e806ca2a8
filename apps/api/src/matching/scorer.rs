//! Candidate Scorer — deterministic keyword ranking of the role catalog.
//!
//! Signals accumulate integer weights per role, then a stable descending sort
//! keeps catalog order as the tie-break. Same profile + same catalog always
//! produces the same ranking; the catalog is never mutated.
//!
//! The substring matching is intentionally bidirectional and loose: the scorer
//! feeds a grounding set, so recall beats precision here.

use crate::catalog::{Role, RoleCatalog};
use crate::config::Config;
use crate::matching::UserProfile;

/// Role titles that get the early-career bonus when the profile signals
/// exploration.
const SENIORITY_NEUTRAL_TITLE_KEYWORDS: &[&str] =
    &["coordinator", "analyst", "associate", "specialist"];

/// Scoring weights and the candidate cut-off. Values are tuning, not
/// invariants; the relative ordering (core skill above everything else) is
/// what the ranking behavior depends on.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub core_skill: i64,
    pub tag: i64,
    pub title: i64,
    pub interest: i64,
    pub early_career: i64,
    pub top_k: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            core_skill: 10,
            tag: 5,
            title: 5,
            interest: 5,
            early_career: 5,
            top_k: 6,
        }
    }
}

impl ScoreWeights {
    pub fn from_config(config: &Config) -> Self {
        Self {
            core_skill: config.weight_core_skill,
            tag: config.weight_tag,
            title: config.weight_title,
            interest: config.weight_interest,
            early_career: config.weight_early_career,
            top_k: config.top_k,
        }
    }
}

/// A role paired with its computed score. Ephemeral, recomputed per request.
#[derive(Debug, Clone)]
pub struct ScoredRole {
    pub role: Role,
    pub score: i64,
}

/// The scorer seam. Carried in `AppState` as `Arc<dyn RoleScorer>` so the
/// backend can be swapped without touching handlers.
pub trait RoleScorer: Send + Sync {
    /// Ranks the catalog against a profile. Never errors: an empty catalog
    /// yields an empty list, which downstream treats as "no grounding".
    fn rank(&self, profile: &UserProfile, catalog: &RoleCatalog) -> Vec<ScoredRole>;
}

/// Default scorer: pure keyword matching, no LLM call.
pub struct KeywordScorer {
    weights: ScoreWeights,
}

impl KeywordScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    fn score_role(&self, profile: &UserProfile, role: &Role) -> i64 {
        let weights = &self.weights;
        let mut score = 0;

        let user_skills: Vec<String> =
            profile.skills.iter().map(|s| s.to_lowercase()).collect();

        // Core skill overlap: bidirectional substring match per core skill.
        for core_skill in &role.core_skills {
            let core_lower = core_skill.to_lowercase();
            if user_skills
                .iter()
                .any(|skill| core_lower.contains(skill.as_str()) || skill.contains(&core_lower))
            {
                score += weights.core_skill;
            }
        }

        // Tag overlap: a user skill containing the tag text.
        for tag in &role.tags {
            let tag_lower = tag.to_lowercase();
            if user_skills.iter().any(|skill| skill.contains(&tag_lower)) {
                score += weights.tag;
            }
        }

        // Title relevance: role title contains the user's job title.
        let title_lower = role.title.to_lowercase();
        let job_title = profile.job_title.trim().to_lowercase();
        if !job_title.is_empty() && title_lower.contains(&job_title) {
            score += weights.title;
        }

        // Interest overlap: per interest, against tags or responsibility areas.
        for interest in &profile.interests {
            let interest_lower = interest.to_lowercase();
            let matches_tags = role.tags.iter().any(|tag| {
                let tag_lower = tag.to_lowercase();
                tag_lower.contains(&interest_lower) || interest_lower.contains(&tag_lower)
            });
            let matches_areas = role.responsibility_areas.iter().any(|area| {
                let area_lower = area.to_lowercase();
                area_lower.contains(&interest_lower) || interest_lower.contains(&area_lower)
            });
            if matches_tags || matches_areas {
                score += weights.interest;
            }
        }

        // Early-career bonus for seniority-neutral titles.
        if profile.is_early_career()
            && SENIORITY_NEUTRAL_TITLE_KEYWORDS
                .iter()
                .any(|keyword| title_lower.contains(keyword))
        {
            score += weights.early_career;
        }

        score
    }
}

impl RoleScorer for KeywordScorer {
    fn rank(&self, profile: &UserProfile, catalog: &RoleCatalog) -> Vec<ScoredRole> {
        let mut scored: Vec<ScoredRole> = catalog
            .roles()
            .iter()
            .map(|role| ScoredRole {
                role: role.clone(),
                score: self.score_role(profile, role),
            })
            .collect();

        // Stable sort: ties keep catalog iteration order.
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(self.weights.top_k);
        scored
    }
}
