//! Admission-control middleware
//!
//! One middleware per named policy. Each resolves the client identity
//! from the request headers, consults the admission controller, and
//! either passes the request through or terminates it with the 429
//! response. A store failure terminates the request too unless the
//! policy is configured fail-open (never the login policy).

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::rate_limit::RateLimitPolicy;

/// Throttle login attempts (credential-guessing defense)
pub async fn rate_limit_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let policy = state.admission.login_policy().clone();
    enforce(&state, &policy, request, next).await
}

/// Throttle general API traffic
pub async fn rate_limit_api(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let policy = state.admission.api_policy().clone();
    enforce(&state, &policy, request, next).await
}

/// Throttle search traffic
///
/// The storefront layers this onto its search routes; the gate itself
/// has none.
pub async fn rate_limit_search(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let policy = state.admission.search_policy().clone();
    enforce(&state, &policy, request, next).await
}

async fn enforce(
    state: &AppState,
    policy: &RateLimitPolicy,
    request: Request,
    next: Next,
) -> Response {
    let decision = match state.admission.check(request.headers(), policy).await {
        Ok(decision) => decision,
        Err(err) => return ApiError::from(err).into_response(),
    };

    if !decision.allowed {
        debug!(
            policy = policy.name,
            reset_at = %decision.reset_at,
            "Request rejected by rate limit"
        );
        return create_rate_limit_response(decision.reset_at);
    }

    next.run(request).await
}

/// Build the terminal 429 response for an exhausted window, with
/// `Retry-After` and `X-RateLimit-Reset` metadata.
pub fn create_rate_limit_response(reset_at: DateTime<Utc>) -> Response {
    ApiError::rate_limited(reset_at).into_response()
}
