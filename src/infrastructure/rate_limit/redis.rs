//! Redis-backed sliding-window store
//!
//! The shared backend for multi-process deployments. Each (policy,
//! identity) pair owns two adjacent fixed buckets; the effective count
//! weights the previous bucket by its remaining overlap with the sliding
//! window, which avoids the boundary bursts the in-memory fallback
//! permits. Counter increments happen server-side (INCR inside an atomic
//! pipeline), never as read-modify-write.
//!
//! Failures are not masked: an unreachable redis fails the admission
//! check, and fail-open handling is the controller's per-policy decision.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redis::aio::ConnectionManager;
use redis::Client;

use crate::config::RedisRateLimitConfig;
use crate::domain::GatewayError;

use super::{AdmissionDecision, RateLimitPolicy, RateLimitStore};

/// Sliding-window counter store on redis
#[derive(Clone)]
pub struct RedisRateLimitStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl fmt::Debug for RedisRateLimitStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRateLimitStore")
            .field("key_prefix", &self.key_prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisRateLimitStore {
    /// Connect to redis. Called once at startup; a failure here refuses
    /// startup rather than silently degrading to the in-memory fallback.
    pub async fn connect(config: &RedisRateLimitConfig) -> Result<Self, GatewayError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            GatewayError::store_unavailable(format!("Failed to create redis client: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            GatewayError::store_unavailable(format!("Failed to connect to redis: {}", e))
        })?;

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn bucket_key(&self, identity: &str, policy: &RateLimitPolicy, bucket: i64) -> String {
        format!("{}:{}:{}", self.key_prefix, policy.client_key(identity), bucket)
    }
}

/// Weighted count across the previous and current bucket.
///
/// `elapsed_secs` is how far into the current bucket the request falls;
/// the previous bucket contributes its count scaled by the remaining
/// overlap of the sliding window.
fn weighted_count(prev: u64, curr: u64, elapsed_secs: u64, window_secs: u64) -> f64 {
    let overlap = 1.0 - (elapsed_secs as f64 / window_secs as f64);
    prev as f64 * overlap + curr as f64
}

fn decision(
    prev: u64,
    curr: u64,
    now: DateTime<Utc>,
    policy: &RateLimitPolicy,
) -> AdmissionDecision {
    let window_secs = policy.window_secs as i64;
    let now_secs = now.timestamp();
    let bucket = now_secs.div_euclid(window_secs);
    let elapsed = now_secs.rem_euclid(window_secs) as u64;

    let count = weighted_count(prev, curr, elapsed, policy.window_secs);
    let allowed = count <= policy.limit as f64;
    let remaining = (policy.limit as f64 - count).max(0.0) as u32;

    // The weighted window drains continuously; the next bucket boundary is
    // the reset time reported to clients.
    let reset_at = Utc
        .timestamp_opt((bucket + 1) * window_secs, 0)
        .single()
        .unwrap_or(now);

    AdmissionDecision {
        allowed,
        remaining,
        limit: policy.limit,
        reset_at,
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn check(
        &self,
        identity: &str,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError> {
        let now = Utc::now();
        let window_secs = policy.window_secs as i64;
        let bucket = now.timestamp().div_euclid(window_secs);

        let curr_key = self.bucket_key(identity, policy, bucket);
        let prev_key = self.bucket_key(identity, policy, bucket - 1);

        // Single round trip: increment the current bucket, refresh its
        // TTL, and read the previous bucket. The INCR is the atomic
        // consume step shared by all concurrent callers.
        let mut conn = self.connection.clone();
        let (curr, _, prev): (u64, i64, Option<u64>) = redis::pipe()
            .atomic()
            .incr(&curr_key, 1u64)
            .expire(&curr_key, window_secs * 2)
            .get(&prev_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                GatewayError::store_unavailable(format!("Rate limit check failed: {}", e))
            })?;

        Ok(decision(prev.unwrap_or(0), curr, now, policy))
    }

    async fn peek(
        &self,
        identity: &str,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError> {
        let now = Utc::now();
        let window_secs = policy.window_secs as i64;
        let bucket = now.timestamp().div_euclid(window_secs);

        let curr_key = self.bucket_key(identity, policy, bucket);
        let prev_key = self.bucket_key(identity, policy, bucket - 1);

        let mut conn = self.connection.clone();
        let (curr, prev): (Option<u64>, Option<u64>) = redis::pipe()
            .get(&curr_key)
            .get(&prev_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                GatewayError::store_unavailable(format!("Rate limit peek failed: {}", e))
            })?;

        // Peek reports what the *next* consuming check would see, without
        // the increment itself.
        let next = curr.unwrap_or(0) + 1;
        Ok(decision(prev.unwrap_or(0), next, now, policy))
    }
}
