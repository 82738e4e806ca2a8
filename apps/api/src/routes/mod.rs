pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::quota;
use crate::recommendation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching (no LLM call)
        .route("/api/v1/roles/match", post(handlers::handle_match_roles))
        // Recommendation pipeline
        .route("/api/v1/recommendations", post(handlers::handle_recommend))
        .route(
            "/api/v1/recommendations/regenerate",
            post(handlers::handle_regenerate),
        )
        .route(
            "/api/v1/recommendations/:id",
            get(handlers::handle_get_recommendation),
        )
        // Project briefs (strict grounding variant)
        .route("/api/v1/briefs", post(handlers::handle_briefs))
        // Quota
        .route("/api/v1/quota", get(quota::handlers::handle_check_quota))
        // Catalog administration
        .route(
            "/api/v1/catalog/reload",
            post(handlers::handle_reload_catalog),
        )
        .with_state(state)
}
