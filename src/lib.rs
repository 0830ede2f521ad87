//! Storefront Gateway
//!
//! The storefront's request admission-control and trust-gating layer:
//! - per-client throttling with named policies (login, api, search)
//!   against a redis sliding window or an in-memory fixed-window fallback
//! - signed, time-bounded session credentials carried in a cookie and
//!   enforced by role on privileged routes
//! - uniform translation of failures into a fixed wire envelope
//!
//! Catalog, cart, checkout, and blog handlers are consumers of this gate,
//! not part of it.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::state::AppState;
use config::Environment;
use domain::GatewayError;
use infrastructure::auth::{Argon2Hasher, InMemoryAdminUserRepository, TokenCodec};
use infrastructure::rate_limit::{
    AdmissionController, MemoryRateLimitStore, RateLimitStore, RedisRateLimitStore,
};

/// Built-in signing secret for development only; production startup
/// refuses to run without a configured secret.
const DEV_TOKEN_SECRET: &str = "storefront-dev-secret-do-not-use-in-production";

/// Build the application state from validated configuration.
///
/// Backend selection happens here, once: with `rate_limit.redis`
/// configured the distributed store is used for the process lifetime,
/// otherwise the in-memory fallback (plus its sweeper) is started.
pub async fn create_app_state(config: &AppConfig) -> Result<AppState, GatewayError> {
    config.validate()?;

    let secret = match &config.auth.token_secret {
        Some(secret) => secret.clone(),
        None => {
            debug_assert!(config.environment == Environment::Development);
            warn!("No auth.token_secret configured; using the built-in development secret");
            DEV_TOKEN_SECRET.to_string()
        }
    };

    let token_codec = Arc::new(TokenCodec::new(&secret)?);

    let store: Arc<dyn RateLimitStore> = match &config.rate_limit.redis {
        Some(redis_config) => {
            info!(url = %redis_config.url, "Using redis rate limit store");
            Arc::new(RedisRateLimitStore::connect(redis_config).await?)
        }
        None => {
            info!("Using in-memory rate limit store (single-process fallback)");
            let store = MemoryRateLimitStore::new();
            store.spawn_sweeper();
            Arc::new(store)
        }
    };

    let admission = Arc::new(AdmissionController::new(store, &config.rate_limit));
    let users = Arc::new(InMemoryAdminUserRepository::from_config(&config.auth));

    Ok(AppState::new(
        admission,
        token_codec,
        Arc::new(Argon2Hasher::new()),
        users,
        config.environment == Environment::Production,
    ))
}
