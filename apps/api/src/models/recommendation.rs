use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted, accepted recommendation. Only fully grounded results are ever
/// written; `assessment` is the serialized `GroundedAssessment`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecommendationRow {
    pub id: Uuid,
    pub identity_key: String,
    pub profile: Value,
    pub assessment: Value,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}
