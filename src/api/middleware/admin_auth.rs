//! Trust gate for privileged routes
//!
//! Reads the session credential from the request cookie, verifies it, and
//! enforces a required role. Absent, malformed, tampered, and expired
//! credentials all produce the identical 401; only a verified credential
//! with the wrong role produces 403. Purely functional over the request.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{Identity, Role};
use crate::infrastructure::auth::{TokenCodec, SESSION_COOKIE};

/// Extractor that requires a verified session credential with any role
#[derive(Debug, Clone)]
pub struct RequireSession(pub Identity);

/// Extractor that requires a verified `ADMIN` credential
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Identity);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = authenticate(&parts.headers, &state.token_codec)?;
        Ok(RequireSession(identity))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = require_role(&parts.headers, &state.token_codec, Role::Admin)?;

        debug!(subject = %identity.subject, "Admin access granted");
        Ok(RequireAdmin(identity))
    }
}

/// Verify the session credential carried by the request, if any.
///
/// The failure modes deliberately collapse into one rejection so a caller
/// probing with stolen or forged cookies learns nothing from the
/// response.
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Result<Identity, ApiError> {
    let token = extract_session_cookie(headers).ok_or_else(ApiError::unauthorized)?;

    codec
        .verify(&token)
        .map(|claims| claims.identity())
        .ok_or_else(ApiError::unauthorized)
}

/// Verify the credential and enforce a required role.
pub fn require_role(
    headers: &HeaderMap,
    codec: &TokenCodec,
    required: Role,
) -> Result<Identity, ApiError> {
    let identity = authenticate(headers, codec)?;

    if identity.role != required {
        return Err(ApiError::forbidden());
    }

    Ok(identity)
}

/// Pull the session credential out of the `Cookie` header.
fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    for pair in cookies.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if name == SESSION_COOKIE {
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            return Some(value.to_string());
        }
    }

    None
}
