use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
///
/// Scoring weights, the retry bound, and quota limits are product tuning
/// parameters rather than structural invariants, so they are env-overridable
/// here instead of being hardcoded at their call sites.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub role_catalog_path: String,
    pub port: u16,
    pub rust_log: String,

    /// Max re-generation attempts after an ungrounded or unparseable result.
    pub max_grounding_retries: u32,
    /// Timeout applied to each individual generation call.
    pub llm_timeout_secs: u64,

    /// Regeneration turns allowed for an anonymous identity.
    pub anon_turn_limit: i64,
    /// Regeneration turns allowed for an entitled identity.
    pub entitled_turn_limit: i64,

    /// Candidate scorer weights. Relative ordering matters more than the values.
    pub weight_core_skill: i64,
    pub weight_tag: i64,
    pub weight_title: i64,
    pub weight_interest: i64,
    pub weight_early_career: i64,
    /// Max candidates surfaced to the generation step.
    pub top_k: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            role_catalog_path: std::env::var("ROLE_CATALOG_PATH")
                .unwrap_or_else(|_| "data/roles.json".to_string()),
            port: env_or("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            max_grounding_retries: env_or("MAX_GROUNDING_RETRIES", 2u32)?,
            llm_timeout_secs: env_or("LLM_TIMEOUT_SECS", 120u64)?,

            anon_turn_limit: env_or("ANON_TURN_LIMIT", 3i64)?,
            entitled_turn_limit: env_or("ENTITLED_TURN_LIMIT", 10i64)?,

            weight_core_skill: env_or("WEIGHT_CORE_SKILL", 10i64)?,
            weight_tag: env_or("WEIGHT_TAG", 5i64)?,
            weight_title: env_or("WEIGHT_TITLE", 5i64)?,
            weight_interest: env_or("WEIGHT_INTEREST", 5i64)?,
            weight_early_career: env_or("WEIGHT_EARLY_CAREER", 5i64)?,
            top_k: env_or("MATCH_TOP_K", 6usize)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}
