mod catalog;
mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod models;
mod quota;
mod recommendation;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::cache::CatalogCache;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::matching::scorer::{KeywordScorer, ScoreWeights};
use crate::quota::store::PgQuotaStore;
use crate::quota::Ledger;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Waypoint API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (quota ledger + persisted recommendations)
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_timeout_secs);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Load the role catalog eagerly so a broken catalog fails startup, not the
    // first request. Later reloads go through the cache's invalidate path.
    let catalog = Arc::new(CatalogCache::new(&config.role_catalog_path));
    info!("Role catalog ready: {} roles", catalog.get()?.len());

    // Candidate scorer with config-driven weights
    let scorer = Arc::new(KeywordScorer::new(ScoreWeights::from_config(&config)));

    // Quota ledger over the Postgres store
    let quota = Ledger::new(Arc::new(PgQuotaStore::new(db.clone())));

    // Build app state
    let state = AppState {
        db,
        llm,
        config: config.clone(),
        catalog,
        scorer,
        quota,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
