//! Authentication endpoints
//!
//! `/auth/login` is the only place a session credential is created; it is
//! throttled by the `login` policy before this handler runs. Logout is
//! client-side for a stateless credential, so the endpoint just expires
//! the cookie.

use axum::{
    extract::State,
    http::header,
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::api::middleware::{rate_limit_api, rate_limit_login, RequireSession};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidationIssue};
use crate::domain::Identity;
use crate::infrastructure::auth::{SESSION_COOKIE, TOKEN_TTL_SECS};

/// Create the authentication router
///
/// Login sits behind the narrow `login` policy; the other routes share
/// the general `api` policy.
pub fn create_auth_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(login).layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_login,
            )),
        )
        .route(
            "/logout",
            post(logout).layer(middleware::from_fn_with_state(state.clone(), rate_limit_api)),
        )
        .route(
            "/me",
            get(get_current_session)
                .layer(middleware::from_fn_with_state(state, rate_limit_api)),
        )
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: SessionResponse,
    pub expires_at: String,
}

/// Identity view (safe to expose)
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub subject: String,
    pub role: String,
    pub email: String,
}

impl SessionResponse {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            subject: identity.subject.clone(),
            role: identity.role.to_string(),
            email: identity.email.clone(),
        }
    }
}

/// Login with email and password
///
/// POST /auth/login
///
/// Issues the session cookie on success. Unknown emails and wrong
/// passwords are answered identically.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request
        .validate()
        .map_err(|errors| ApiError::validation(validation_issues(errors)))?;

    let user = state
        .users
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %request.email, "Login attempt for unknown user");
            ApiError::invalid_credentials()
        })?;

    if !state
        .password_hasher
        .verify(&request.password, &user.password_hash)
    {
        warn!(subject = %user.id, "Login attempt with wrong password");
        return Err(ApiError::invalid_credentials());
    }

    let token = state.token_codec.sign(&user.id, user.role, &user.email)?;
    let expires_at = Utc::now() + Duration::seconds(TOKEN_TTL_SECS);

    info!(subject = %user.id, "Login succeeded");

    let identity = Identity {
        subject: user.id,
        role: user.role,
        email: user.email,
    };

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(&token, state.cookie_secure),
        )]),
        Json(LoginResponse {
            user: SessionResponse::from_identity(&identity),
            expires_at: expires_at.to_rfc3339(),
        }),
    ))
}

/// Logout (client-side for a stateless credential)
///
/// POST /auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(state.cookie_secure))]),
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Get the current verified session
///
/// GET /auth/me
pub async fn get_current_session(
    RequireSession(identity): RequireSession,
) -> Json<SessionResponse> {
    Json(SessionResponse::from_identity(&identity))
}

fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, TOKEN_TTL_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn validation_issues(errors: validator::ValidationErrors) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            issues.push(ValidationIssue {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed {} validation", error.code)),
            });
        }
    }

    issues
}
