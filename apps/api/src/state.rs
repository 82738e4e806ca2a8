use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::cache::CatalogCache;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::matching::scorer::RoleScorer;
use crate::quota::Ledger;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub config: Config,
    /// Role catalog behind its init-once/invalidate cache.
    pub catalog: Arc<CatalogCache>,
    /// Pluggable candidate scorer. Default: KeywordScorer with config weights.
    pub scorer: Arc<dyn RoleScorer>,
    /// Quota ledger over the persistent store.
    pub quota: Ledger,
}
