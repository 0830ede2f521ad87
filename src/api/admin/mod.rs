//! Admin route group
//!
//! Everything nested here sits behind the `api` admission policy and the
//! admin trust gate. The storefront's own back-office handlers (catalog,
//! orders, blog) nest alongside `/session` with the same extractor.

use axum::{routing::get, Router};

use crate::api::auth::SessionResponse;
use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::Json;

/// Create the admin router
pub fn create_admin_router() -> Router<AppState> {
    Router::new().route("/session", get(get_admin_session))
}

/// Confirm gate passage and return the verified admin identity
///
/// GET /admin/session
pub async fn get_admin_session(RequireAdmin(identity): RequireAdmin) -> Json<SessionResponse> {
    Json(SessionResponse::from_identity(&identity))
}
