//! In-memory fixed-window fallback store
//!
//! Single-process only. This backend is a deliberate simplification of the
//! distributed sliding window: counters reset at fixed boundaries, so a
//! client can burst up to 2x the limit across a window edge. Deployments
//! that need the stricter semantics configure the redis backend instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::GatewayError;

use super::{AdmissionDecision, RateLimitPolicy, RateLimitStore};

/// Interval between background sweeps of elapsed windows
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// One counter window for a client key
#[derive(Debug, Clone)]
struct CounterEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
}

/// Fixed-window counter store backed by a process-wide map
///
/// The read-check-increment sequence runs under a single write lock, so
/// concurrent requests for the same key never lose increments. The
/// periodic sweeper takes the same lock and is the only other mutator.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    entries: Arc<RwLock<HashMap<String, CounterEntry>>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the background sweeper. Deletes entries whose window has
    /// elapsed every five minutes, bounding memory growth.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let entries = Arc::clone(&self.entries);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            // The first tick fires immediately; skip it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = sweep(&entries).await;
                if removed > 0 {
                    debug!(removed, "Swept elapsed rate limit windows");
                }
            }
        })
    }

    #[cfg(test)]
    async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

async fn sweep(entries: &RwLock<HashMap<String, CounterEntry>>) -> usize {
    let now = Utc::now();
    let mut entries = entries.write().await;
    let before = entries.len();
    entries.retain(|_, entry| entry.window_reset_at > now);
    before - entries.len()
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn check(
        &self,
        identity: &str,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError> {
        let key = policy.client_key(identity);
        let now = Utc::now();
        let window = chrono::Duration::seconds(policy.window_secs as i64);

        let mut entries = self.entries.write().await;

        match entries.get_mut(&key) {
            Some(entry) if now <= entry.window_reset_at => {
                if entry.count >= policy.limit {
                    // Denied requests do not consume from the window.
                    return Ok(AdmissionDecision {
                        allowed: false,
                        remaining: 0,
                        limit: policy.limit,
                        reset_at: entry.window_reset_at,
                    });
                }

                entry.count += 1;
                Ok(AdmissionDecision {
                    allowed: true,
                    remaining: policy.limit - entry.count,
                    limit: policy.limit,
                    reset_at: entry.window_reset_at,
                })
            }
            _ => {
                // No entry, or the previous window has fully elapsed.
                let reset_at = now + window;
                entries.insert(
                    key,
                    CounterEntry {
                        count: 1,
                        window_reset_at: reset_at,
                    },
                );

                Ok(AdmissionDecision {
                    allowed: true,
                    remaining: policy.limit.saturating_sub(1),
                    limit: policy.limit,
                    reset_at,
                })
            }
        }
    }

    async fn peek(
        &self,
        identity: &str,
        policy: &RateLimitPolicy,
    ) -> Result<AdmissionDecision, GatewayError> {
        let key = policy.client_key(identity);
        let now = Utc::now();

        let entries = self.entries.read().await;

        match entries.get(&key) {
            Some(entry) if now <= entry.window_reset_at => Ok(AdmissionDecision {
                allowed: entry.count < policy.limit,
                remaining: policy.limit.saturating_sub(entry.count),
                limit: policy.limit,
                reset_at: entry.window_reset_at,
            }),
            _ => Ok(AdmissionDecision {
                allowed: true,
                remaining: policy.limit,
                limit: policy.limit,
                reset_at: now + chrono::Duration::seconds(policy.window_secs as i64),
            }),
        }
    }
}
