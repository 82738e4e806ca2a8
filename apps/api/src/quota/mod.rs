//! Usage Quota Ledger — hard cap on regeneration turns per identity.
//!
//! Identity classes differ only in which limit applies; the ledger itself is
//! class-agnostic. All mutation goes through the store's atomic
//! increment-with-ceiling; there is no separate read-then-write path, so the
//! counter can never exceed the limit under concurrent consumers.

pub mod handlers;
pub mod store;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::quota::store::QuotaStore;

/// Cookie carrying the locally-issued anonymous token. The caller must retain
/// it across requests or every request becomes a fresh identity.
pub const ANON_COOKIE: &str = "wp_anon";

/// The identity a request is charged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Bearer of a locally-issued opaque token, minted on first contact.
    Anonymous(String),
    /// Bearer of an entitlement token from the external checkout flow.
    Entitled(String),
}

impl Identity {
    /// Storage key. Class-prefixed so an anonymous token can never collide
    /// with an entitlement token.
    pub fn key(&self) -> String {
        match self {
            Identity::Anonymous(token) => format!("anon:{token}"),
            Identity::Entitled(token) => format!("ent:{token}"),
        }
    }

    pub fn limit(&self, config: &Config) -> i64 {
        match self {
            Identity::Anonymous(_) => config.anon_turn_limit,
            Identity::Entitled(_) => config.entitled_turn_limit,
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Identity::Anonymous(_) => "anonymous",
            Identity::Entitled(_) => "entitled",
        }
    }
}

/// Result of resolving request headers to an identity. `minted_token` is set
/// when a fresh anonymous token was issued and must be returned via Set-Cookie.
#[derive(Debug)]
pub struct ResolvedIdentity {
    pub identity: Identity,
    pub minted_token: Option<String>,
}

/// Resolves the request identity: entitlement bearer first, then the
/// anonymous cookie, else a freshly minted anonymous token.
pub fn resolve_identity(headers: &HeaderMap) -> ResolvedIdentity {
    if let Some(token) = bearer_token(headers) {
        return ResolvedIdentity {
            identity: Identity::Entitled(token),
            minted_token: None,
        };
    }

    if let Some(token) = cookie_value(headers, ANON_COOKIE) {
        return ResolvedIdentity {
            identity: Identity::Anonymous(token),
            minted_token: None,
        };
    }

    let token = Uuid::new_v4().to_string();
    ResolvedIdentity {
        identity: Identity::Anonymous(token.clone()),
        minted_token: Some(token),
    }
}

/// Set-Cookie value for a minted anonymous token.
pub fn anon_set_cookie(token: &str) -> String {
    format!("{ANON_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age=31536000")
}

/// Appends the Set-Cookie header for a freshly minted anonymous token, if any.
pub fn apply_minted_cookie(response: &mut axum::response::Response, minted: Option<&str>) {
    if let Some(token) = minted {
        if let Ok(value) = axum::http::HeaderValue::from_str(&anon_set_cookie(token)) {
            response
                .headers_mut()
                .append(axum::http::header::SET_COOKIE, value);
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// The `{used, limit, remaining}` view returned by both ledger operations.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Allowance {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

impl Allowance {
    fn new(used: i64, limit: i64) -> Self {
        Self {
            used,
            limit,
            remaining: (limit - used).max(0),
        }
    }
}

/// Ledger facade over the quota store. Never retries internally: exceeding
/// quota is reported immediately.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn QuotaStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    /// Read-only allowance check. Never mutates, never creates a record.
    pub async fn check_allowance(
        &self,
        identity: &Identity,
        limit: i64,
    ) -> Result<Allowance, AppError> {
        let used = self.store.usage(&identity.key()).await?.unwrap_or(0);
        Ok(Allowance::new(used, limit))
    }

    /// Consumes one turn, or fails with `QuotaExceeded` without mutating.
    pub async fn consume_turn(
        &self,
        identity: &Identity,
        limit: i64,
    ) -> Result<Allowance, AppError> {
        match self.store.increment_below(&identity.key(), limit).await? {
            Some(used) => Ok(Allowance::new(used, limit)),
            None => {
                let used = self.store.usage(&identity.key()).await?.unwrap_or(0);
                Err(AppError::QuotaExceeded { used, limit })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::store::MemoryQuotaStore;
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_resolves_entitled() {
        let headers = headers_with(AUTHORIZATION, "Bearer tok-123");
        let resolved = resolve_identity(&headers);
        assert_eq!(resolved.identity, Identity::Entitled("tok-123".to_string()));
        assert!(resolved.minted_token.is_none());
    }

    #[test]
    fn test_entitlement_preferred_over_anon_cookie() {
        let mut headers = headers_with(AUTHORIZATION, "Bearer tok-123");
        headers.insert(COOKIE, HeaderValue::from_static("wp_anon=abc"));
        let resolved = resolve_identity(&headers);
        assert!(matches!(resolved.identity, Identity::Entitled(_)));
    }

    #[test]
    fn test_anon_cookie_reused_across_requests() {
        let headers = headers_with(COOKIE, "theme=dark; wp_anon=abc-def; other=1");
        let resolved = resolve_identity(&headers);
        assert_eq!(resolved.identity, Identity::Anonymous("abc-def".to_string()));
        assert!(resolved.minted_token.is_none());
    }

    #[test]
    fn test_first_contact_mints_anon_token() {
        let resolved = resolve_identity(&HeaderMap::new());
        let minted = resolved.minted_token.expect("token must be minted");
        assert_eq!(resolved.identity, Identity::Anonymous(minted.clone()));
        assert!(anon_set_cookie(&minted).starts_with("wp_anon="));
    }

    #[test]
    fn test_identity_keys_are_class_prefixed() {
        let token = "same-token".to_string();
        assert_ne!(
            Identity::Anonymous(token.clone()).key(),
            Identity::Entitled(token).key()
        );
    }

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(MemoryQuotaStore::default()))
    }

    fn anon(token: &str) -> Identity {
        Identity::Anonymous(token.to_string())
    }

    #[tokio::test]
    async fn test_check_allowance_never_creates_a_record() {
        let store = Arc::new(MemoryQuotaStore::default());
        let ledger = Ledger::new(store.clone());
        let allowance = ledger.check_allowance(&anon("a"), 3).await.unwrap();
        assert_eq!(allowance, Allowance::new(0, 3));
        assert!(store.usage("anon:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_turns_until_limit() {
        let ledger = ledger();
        let identity = anon("a");

        for expected in 1..=3 {
            let allowance = ledger.consume_turn(&identity, 3).await.unwrap();
            assert_eq!(allowance.used, expected);
        }

        let err = ledger.consume_turn(&identity, 3).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded { used: 3, limit: 3 }));
        // The failed consume must not have mutated the count.
        assert_eq!(ledger.check_allowance(&identity, 3).await.unwrap().used, 3);
    }

    #[tokio::test]
    async fn test_zero_limit_never_creates_a_record() {
        let store = Arc::new(MemoryQuotaStore::default());
        let ledger = Ledger::new(store.clone());
        let err = ledger.consume_turn(&anon("a"), 0).await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded { used: 0, limit: 0 }));
        assert!(store.usage("anon:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identities_do_not_share_counters() {
        let ledger = ledger();
        ledger.consume_turn(&anon("a"), 3).await.unwrap();
        let allowance = ledger.check_allowance(&anon("b"), 3).await.unwrap();
        assert_eq!(allowance.used, 0);
    }

    #[tokio::test]
    async fn test_concurrent_consumes_respect_the_ceiling() {
        // 5 concurrent turns against limit 3: exactly 3 succeed and the
        // stored count lands on exactly 3.
        let store = Arc::new(MemoryQuotaStore::default());
        let ledger = Arc::new(Ledger::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.consume_turn(&Identity::Anonymous("a".to_string()), 3).await
            }));
        }

        let mut successes = 0;
        let mut quota_failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::QuotaExceeded { .. }) => quota_failures += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(quota_failures, 2);
        assert_eq!(store.usage("anon:a").await.unwrap(), Some(3));
    }
}
