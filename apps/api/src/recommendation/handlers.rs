//! Axum route handlers for the recommendation API.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::scorer::ScoredRole;
use crate::matching::UserProfile;
use crate::models::recommendation::RecommendationRow;
use crate::quota::{apply_minted_cookie, resolve_identity, Allowance, ResolvedIdentity};
use crate::recommendation::briefs::generate_briefs;
use crate::recommendation::generator::{generate_assessment, GenerationOptions, PipelineOutcome};
use crate::recommendation::models::{GroundedAssessment, ProjectBrief};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MatchedRole {
    pub role_id: String,
    pub title: String,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub candidates: Vec<MatchedRole>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub recommendation_id: Uuid,
    pub assessment: GroundedAssessment,
    pub attempts: u32,
    /// Present on regeneration responses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowance: Option<Allowance>,
}

#[derive(Debug, Serialize)]
pub struct BriefsResponse {
    pub briefs: Vec<ProjectBrief>,
    pub attempts: u32,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub roles: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/roles/match
///
/// Scores the catalog against a profile without calling the LLM. Useful for
/// previewing the grounding set before generating.
pub async fn handle_match_roles(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<MatchResponse>, AppError> {
    validate_profile(&profile)?;
    let candidates = rank_candidates(&state, &profile)?;

    Ok(Json(MatchResponse {
        candidates: candidates
            .into_iter()
            .map(|c| MatchedRole {
                role_id: c.role.id,
                title: c.role.title,
                score: c.score,
            })
            .collect(),
    }))
}

/// POST /api/v1/recommendations
///
/// Full pipeline: rank → generate → parse → repair → grounding enforcement.
/// The first generation is free; only regeneration consumes quota turns.
pub async fn handle_recommend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<UserProfile>,
) -> Result<Response, AppError> {
    validate_profile(&profile)?;
    let resolved = resolve_identity(&headers);

    let outcome = run_pipeline(&state, &profile).await?;
    let recommendation_id =
        persist_recommendation(&state.db, &resolved, &profile, &outcome).await?;

    let mut response = Json(RecommendResponse {
        recommendation_id,
        assessment: outcome.assessment,
        attempts: outcome.attempts,
        allowance: None,
    })
    .into_response();
    apply_minted_cookie(&mut response, resolved.minted_token.as_deref());
    Ok(response)
}

/// POST /api/v1/recommendations/regenerate
///
/// Same pipeline, gated by the quota ledger. The turn is consumed before the
/// generation attempt; an over-limit identity fails fast with QUOTA_EXCEEDED
/// and no LLM call is made.
pub async fn handle_regenerate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<UserProfile>,
) -> Result<Response, AppError> {
    validate_profile(&profile)?;
    let resolved = resolve_identity(&headers);

    let limit = resolved.identity.limit(&state.config);
    let allowance = state.quota.consume_turn(&resolved.identity, limit).await?;
    info!(
        "Regeneration turn consumed: {}/{} for {} identity",
        allowance.used,
        allowance.limit,
        resolved.identity.class()
    );

    let outcome = run_pipeline(&state, &profile).await?;
    let recommendation_id =
        persist_recommendation(&state.db, &resolved, &profile, &outcome).await?;

    let mut response = Json(RecommendResponse {
        recommendation_id,
        assessment: outcome.assessment,
        attempts: outcome.attempts,
        allowance: Some(allowance),
    })
    .into_response();
    apply_minted_cookie(&mut response, resolved.minted_token.as_deref());
    Ok(response)
}

/// GET /api/v1/recommendations/:id
pub async fn handle_get_recommendation(
    State(state): State<AppState>,
    Path(recommendation_id): Path<Uuid>,
) -> Result<Json<RecommendationRow>, AppError> {
    let row =
        sqlx::query_as::<_, RecommendationRow>("SELECT * FROM recommendations WHERE id = $1")
            .bind(recommendation_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Recommendation {recommendation_id} not found"))
            })?;
    Ok(Json(row))
}

/// POST /api/v1/briefs
///
/// Project-brief variant of the pipeline with the stricter verbatim-title
/// grounding rule.
pub async fn handle_briefs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<UserProfile>,
) -> Result<Response, AppError> {
    validate_profile(&profile)?;
    let resolved = resolve_identity(&headers);

    let candidates = rank_candidates(&state, &profile)?;
    let options = GenerationOptions::from_config(&state.config);
    let outcome = generate_briefs(&state.llm, &profile, &candidates, &options).await?;

    let mut response = Json(BriefsResponse {
        briefs: outcome.briefs,
        attempts: outcome.attempts,
    })
    .into_response();
    apply_minted_cookie(&mut response, resolved.minted_token.as_deref());
    Ok(response)
}

/// POST /api/v1/catalog/reload
///
/// Explicit cache invalidation: drops the cached catalog and reloads it from
/// disk, reporting the new role count.
pub async fn handle_reload_catalog(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, AppError> {
    state.catalog.invalidate();
    let catalog = state.catalog.get().map_err(AppError::Internal)?;
    info!("Role catalog reloaded: {} roles", catalog.len());
    Ok(Json(ReloadResponse {
        roles: catalog.len(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Shared pipeline plumbing
// ────────────────────────────────────────────────────────────────────────────

fn validate_profile(profile: &UserProfile) -> Result<(), AppError> {
    if profile.job_title.trim().is_empty() && profile.skills.is_empty() {
        return Err(AppError::Validation(
            "Provide at least a job title or some skills".to_string(),
        ));
    }
    Ok(())
}

fn rank_candidates(state: &AppState, profile: &UserProfile) -> Result<Vec<ScoredRole>, AppError> {
    let catalog = state.catalog.get().map_err(AppError::Internal)?;
    Ok(state.scorer.rank(profile, &catalog))
}

async fn run_pipeline(state: &AppState, profile: &UserProfile) -> Result<PipelineOutcome, AppError> {
    let candidates = rank_candidates(state, profile)?;
    let options = GenerationOptions::from_config(&state.config);
    generate_assessment(&state.llm, profile, &candidates, &options).await
}

/// Persists an accepted (fully grounded) result. Partial repair state never
/// reaches this function.
async fn persist_recommendation(
    pool: &PgPool,
    resolved: &ResolvedIdentity,
    profile: &UserProfile,
    outcome: &PipelineOutcome,
) -> Result<Uuid, AppError> {
    let recommendation_id = Uuid::new_v4();
    let profile_value = serde_json::to_value(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;
    let assessment_value = serde_json::to_value(&outcome.assessment)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize assessment: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO recommendations (id, identity_key, profile, assessment, attempts)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(recommendation_id)
    .bind(resolved.identity.key())
    .bind(&profile_value)
    .bind(&assessment_value)
    .bind(outcome.attempts as i32)
    .execute(pool)
    .await?;

    info!(
        "Persisted recommendation {} ({} grounded roles, {} attempts)",
        recommendation_id,
        outcome.assessment.grounded_role_ids.len(),
        outcome.attempts
    );

    Ok(recommendation_id)
}
