// Candidate matching: ranks the role catalog against a user profile.
// Pure computation, no I/O. The top-K output is the only grounding set the
// generation step is allowed to reference.

pub mod scorer;

use serde::{Deserialize, Serialize};

/// What the user is trying to get out of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudienceGoal {
    Exploration,
    Advancement,
    CareerSwitch,
}

/// Free-form user profile, one per request. Never persisted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub job_title: String,
    pub industry: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub years_experience: Option<u8>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub goal: Option<AudienceGoal>,
}

impl UserProfile {
    /// True when the profile signals early-career exploration. Drives the
    /// seniority-neutral title bonus in scoring.
    pub fn is_early_career(&self) -> bool {
        matches!(self.goal, Some(AudienceGoal::Exploration))
            || matches!(self.years_experience, Some(years) if years <= 1)
    }
}
