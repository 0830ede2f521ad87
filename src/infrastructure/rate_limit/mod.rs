//! Request admission control
//!
//! Named policies are applied against a pluggable counter store. Two
//! backends exist: a redis-backed sliding window shared across processes
//! and an in-memory fixed-window fallback for single-process deployments.
//! The backend is chosen once at startup; a backend outage mid-process
//! fails the admission check rather than switching stores.

pub mod memory;
pub mod redis;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::domain::GatewayError;
use crate::infrastructure::client_ip::resolve_client_identity;

pub use memory::MemoryRateLimitStore;
pub use redis::RedisRateLimitStore;

/// A named admission policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub limit: u32,
    pub window_secs: u64,
    /// Admit on backend failure instead of failing the request. The login
    /// policy never sets this.
    pub fail_open: bool,
}

impl RateLimitPolicy {
    pub fn new(name: &'static str, limit: u32, window_secs: u64) -> Self {
        Self {
            name,
            limit,
            window_secs,
            fail_open: false,
        }
    }

    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Counter key for one (identity, policy) pair. Changing a policy's
    /// numbers retires its old counters instead of misreading them.
    pub fn client_key(&self, identity: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            self.name, self.limit, self.window_secs, identity
        )
    }
}

/// Outcome of an admission check. Transient, computed per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: DateTime<Utc>,
}

impl AdmissionDecision {
    /// Seconds until the current window resets, for `Retry-After`
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.reset_at - now).num_seconds().max(0) as u64
    }
}

/// Pluggable counter backend
///
/// `check` is the single consuming operation: counting the request against
/// the window and deciding are one atomic step. `peek` inspects the window
/// without consuming from it and must never mutate a counter.
#[async_trait]
pub trait RateLimitStore: Send + Sync + Debug {
    async fn check(
        &self,
        identity: &str,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError>;

    async fn peek(
        &self,
        identity: &str,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError>;
}

/// Applies named policies against the configured store
#[derive(Debug, Clone)]
pub struct AdmissionController {
    store: Arc<dyn RateLimitStore>,
    login: RateLimitPolicy,
    api: RateLimitPolicy,
    search: RateLimitPolicy,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn RateLimitStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            login: RateLimitPolicy::new("login", config.login.limit, config.login.window_secs),
            api: RateLimitPolicy::new("api", config.api.limit, config.api.window_secs)
                .with_fail_open(config.api.fail_open),
            search: RateLimitPolicy::new("search", config.search.limit, config.search.window_secs)
                .with_fail_open(config.search.fail_open),
        }
    }

    pub fn login_policy(&self) -> &RateLimitPolicy {
        &self.login
    }

    pub fn api_policy(&self) -> &RateLimitPolicy {
        &self.api
    }

    pub fn search_policy(&self) -> &RateLimitPolicy {
        &self.search
    }

    /// Admission check for an ad-hoc limit/window pair.
    pub async fn check_rate_limit(
        &self,
        headers: &HeaderMap,
        limit: u32,
        window_secs: u64,
    ) -> Result<AdmissionDecision, GatewayError> {
        let policy = RateLimitPolicy::new("custom", limit, window_secs);
        self.check(headers, &policy).await
    }

    /// Admission check under a named policy. The request is counted
    /// against the window as part of the decision.
    pub async fn check(
        &self,
        headers: &HeaderMap,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError> {
        let identity = resolve_client_identity(headers);

        match self.store.check(&identity, policy).await {
            Ok(decision) => Ok(decision),
            Err(err) if policy.fail_open => {
                warn!(
                    policy = policy.name,
                    error = %err,
                    "Rate limit store unavailable; admitting (fail-open policy)"
                );
                Ok(AdmissionDecision {
                    allowed: true,
                    remaining: policy.limit,
                    limit: policy.limit,
                    reset_at: Utc::now()
                        + chrono::Duration::seconds(policy.window_secs as i64),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Inspect the current window for an identity without consuming.
    pub async fn peek(
        &self,
        headers: &HeaderMap,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError> {
        let identity = resolve_client_identity(headers);
        self.store.peek(&identity, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl RateLimitStore for FailingStore {
        async fn check(
            &self,
            _identity: &str,
            _policy: &RateLimitPolicy,
        ) -> Result<AdmissionDecision, GatewayError> {
            Err(GatewayError::store_unavailable("connection refused"))
        }

        async fn peek(
            &self,
            _identity: &str,
            _policy: &RateLimitPolicy,
        ) -> Result<AdmissionDecision, GatewayError> {
            Err(GatewayError::store_unavailable("connection refused"))
        }
    }

    fn controller(store: Arc<dyn RateLimitStore>) -> AdmissionController {
        AdmissionController::new(store, &RateLimitConfig::default())
    }

    #[test]
    fn test_client_key_includes_policy_parameters() {
        let policy = RateLimitPolicy::new("login", 5, 900);
        assert_eq!(policy.client_key("203.0.113.7"), "login:5:900:203.0.113.7");
    }

    #[test]
    fn test_retry_after_saturates_at_zero() {
        let now = Utc::now();
        let decision = AdmissionDecision {
            allowed: false,
            remaining: 0,
            limit: 5,
            reset_at: now - chrono::Duration::seconds(10),
        };

        assert_eq!(decision.retry_after_secs(now), 0);
    }

    #[tokio::test]
    async fn test_login_fails_closed_on_store_error() {
        let controller = controller(Arc::new(FailingStore));
        let headers = HeaderMap::new();

        let policy = controller.login_policy().clone();
        let result = controller.check(&headers, &policy).await;

        assert!(matches!(
            result,
            Err(GatewayError::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_fail_open_policy_admits_on_store_error() {
        let mut config = RateLimitConfig::default();
        config.api.fail_open = true;

        let controller = AdmissionController::new(Arc::new(FailingStore), &config);
        let headers = HeaderMap::new();

        let policy = controller.api_policy().clone();
        let decision = controller.check(&headers, &policy).await.unwrap();

        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn test_named_policies_from_config() {
        let controller = controller(Arc::new(FailingStore));

        assert_eq!(controller.login_policy().limit, 5);
        assert_eq!(controller.login_policy().window_secs, 900);
        assert!(!controller.login_policy().fail_open);
        assert_eq!(controller.api_policy().limit, 100);
        assert_eq!(controller.search_policy().limit, 30);
    }
}
