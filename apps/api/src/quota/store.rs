//! Quota store — the persistence seam behind the ledger.
//!
//! The contract is a single atomic increment-with-ceiling: create-or-increment
//! keyed by the identity's uniqueness constraint, refusing the increment once
//! the ceiling is reached. Callers never do a separate read-then-write.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;

#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Current usage for an identity, `None` if no record exists yet.
    async fn usage(&self, identity_key: &str) -> Result<Option<i64>, AppError>;

    /// Atomically creates-or-increments the identity's counter, returning the
    /// new count, or `None` (without mutating) when `used >= limit`.
    async fn increment_below(&self, identity_key: &str, limit: i64)
        -> Result<Option<i64>, AppError>;
}

/// Postgres-backed store. The `ON CONFLICT` target is the identity key's
/// uniqueness constraint, so concurrent first-time callers collapse into one
/// row, and the `WHERE` guard makes the ceiling part of the same statement.
pub struct PgQuotaStore {
    pool: PgPool,
}

impl PgQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    async fn usage(&self, identity_key: &str) -> Result<Option<i64>, AppError> {
        let used: Option<i64> =
            sqlx::query_scalar("SELECT used FROM usage_ledger WHERE identity_key = $1")
                .bind(identity_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(used)
    }

    async fn increment_below(
        &self,
        identity_key: &str,
        limit: i64,
    ) -> Result<Option<i64>, AppError> {
        // The SELECT guard keeps a zero limit from inserting the first row;
        // the DO UPDATE guard enforces the ceiling on existing rows. No row
        // back means the increment was refused.
        let used: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO usage_ledger (identity_key, used)
            SELECT $1, 1 WHERE $2 >= 1
            ON CONFLICT (identity_key)
            DO UPDATE SET used = usage_ledger.used + 1, updated_at = NOW()
            WHERE usage_ledger.used < $2
            RETURNING used
            "#,
        )
        .bind(identity_key)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;
        Ok(used)
    }
}

/// In-memory store with the same ceiling semantics, for ledger tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryQuotaStore {
    rows: tokio::sync::Mutex<std::collections::HashMap<String, i64>>,
}

#[cfg(test)]
#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn usage(&self, identity_key: &str) -> Result<Option<i64>, AppError> {
        Ok(self.rows.lock().await.get(identity_key).copied())
    }

    async fn increment_below(
        &self,
        identity_key: &str,
        limit: i64,
    ) -> Result<Option<i64>, AppError> {
        let mut rows = self.rows.lock().await;
        let used = rows.get(identity_key).copied().unwrap_or(0);
        if used >= limit {
            return Ok(None);
        }
        rows.insert(identity_key.to_string(), used + 1);
        Ok(Some(used + 1))
    }
}
