//! Axum route handlers for the quota API.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::quota::{apply_minted_cookie, resolve_identity};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub identity_class: &'static str,
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

/// GET /api/v1/quota
///
/// Read-only allowance for the resolved identity. Mints (and sets) an
/// anonymous token on first contact so the caller's later regenerations are
/// charged consistently.
pub async fn handle_check_quota(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let resolved = resolve_identity(&headers);
    let limit = resolved.identity.limit(&state.config);
    let allowance = state.quota.check_allowance(&resolved.identity, limit).await?;

    let mut response = Json(QuotaResponse {
        identity_class: resolved.identity.class(),
        used: allowance.used,
        limit: allowance.limit,
        remaining: allowance.remaining,
    })
    .into_response();
    apply_minted_cookie(&mut response, resolved.minted_token.as_deref());
    Ok(response)
}
