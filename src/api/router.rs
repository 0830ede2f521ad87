use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin;
use super::auth;
use super::health;
use super::middleware::{rate_limit_api, security_headers_middleware};
use super::state::AppState;

/// Create the full router with application state
///
/// Composition order for gated routes: admission control first, trust
/// gate second (inside the handler's extractor), handler last.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints, never throttled (probe traffic)
        .route("/health", get(health::health_check))
        .route("/live", get(health::live_check))
        // Authentication endpoints (login is where credentials are born)
        .nest("/auth", auth::create_auth_router(state.clone()))
        // Admin back-office, behind the api policy and the trust gate
        .nest(
            "/admin",
            admin::create_admin_router().route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_api,
            )),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::RateLimitConfig;
    use crate::domain::{Role, StoredUser};
    use crate::infrastructure::auth::{
        Argon2Hasher, InMemoryAdminUserRepository, PasswordHasher, TokenCodec, SESSION_COOKIE,
    };
    use crate::infrastructure::rate_limit::{AdmissionController, MemoryRateLimitStore};

    const SECRET: &str = "test-secret-0123456789abcdef0123456789";
    const ADMIN_EMAIL: &str = "admin@shop.example";
    const ADMIN_PASSWORD: &str = "hunter2!hunter2!";

    fn test_state(rate_limit: RateLimitConfig) -> AppState {
        let hasher = Argon2Hasher::new();
        let users = InMemoryAdminUserRepository::new(vec![StoredUser {
            id: "admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hasher.hash(ADMIN_PASSWORD).unwrap(),
            role: Role::Admin,
        }]);

        AppState::new(
            Arc::new(AdmissionController::new(
                Arc::new(MemoryRateLimitStore::new()),
                &rate_limit,
            )),
            Arc::new(TokenCodec::new(SECRET).unwrap()),
            Arc::new(hasher),
            Arc::new(users),
            false,
        )
    }

    fn app(rate_limit: RateLimitConfig) -> Router {
        create_router(test_state(rate_limit))
    }

    fn login_request(ip: &str, email: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({"email": email, "password": password}).to_string(),
            ))
            .unwrap()
    }

    fn admin_request(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri("/admin/session");
        if let Some(token) = cookie {
            builder = builder.header(
                header::COOKIE,
                format!("{}={}", SESSION_COOKIE, token),
            );
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_session_cookie() {
        let app = app(RateLimitConfig::default());

        let response = app
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with(SESSION_COOKIE));
        assert!(cookie.contains("HttpOnly"));

        let body = body_json(response).await;
        assert_eq!(body["user"]["role"], "ADMIN");
        assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let app = app(RateLimitConfig::default());

        let response = app
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, "wrong-password"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_policy_exhaustion() {
        // login policy default: 5 requests per 900s window.
        let app = app(RateLimitConfig::default());

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, "wrong-password"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        // Sixth attempt is denied even with correct credentials.
        let response = app
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: i64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((880..=900).contains(&retry_after));
        assert!(response.headers().contains_key("x-ratelimit-reset"));

        let body = body_json(response).await;
        assert_eq!(body["error"], "Too many requests");
        assert_eq!(
            body["message"],
            "Rate limit exceeded. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_login_policy_isolates_identities() {
        let app = app(RateLimitConfig::default());

        for _ in 0..5 {
            app.clone()
                .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, "wrong-password"))
                .await
                .unwrap();
        }

        let blocked = app
            .clone()
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

        // A different client identity still has a fresh window.
        let other = app
            .oneshot(login_request("198.51.100.4", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_window_elapse_admits_again() {
        let mut rate_limit = RateLimitConfig::default();
        rate_limit.login.limit = 1;
        rate_limit.login.window_secs = 1;
        let app = app(rate_limit);

        let first = app
            .clone()
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let third = app
            .oneshot(login_request("203.0.113.7", ADMIN_EMAIL, ADMIN_PASSWORD))
            .await
            .unwrap();
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_without_cookie_unauthorized() {
        let app = app(RateLimitConfig::default());

        let response = app.oneshot(admin_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_tampered_cookie_matches_absent() {
        let app = app(RateLimitConfig::default());
        let codec = TokenCodec::new(SECRET).unwrap();

        let token = codec.sign("admin", Role::Admin, ADMIN_EMAIL).unwrap();
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let absent = app.clone().oneshot(admin_request(None)).await.unwrap();
        let invalid = app.oneshot(admin_request(Some(&tampered))).await.unwrap();

        assert_eq!(absent.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);

        let absent_body = body_json(absent).await;
        let invalid_body = body_json(invalid).await;
        assert_eq!(absent_body, invalid_body);
    }

    #[tokio::test]
    async fn test_admin_expired_cookie_unauthorized() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let app = app(RateLimitConfig::default());

        let past = chrono::Utc::now() - chrono::Duration::hours(1);
        let claims = crate::infrastructure::auth::SessionClaims {
            sub: "admin".to_string(),
            role: Role::Admin,
            email: ADMIN_EMAIL.to_string(),
            iat: (past - chrono::Duration::hours(2)).timestamp(),
            exp: past.timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let response = app.oneshot(admin_request(Some(&token))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_customer_role_forbidden() {
        let app = app(RateLimitConfig::default());
        let codec = TokenCodec::new(SECRET).unwrap();

        let token = codec
            .sign("cust-1", Role::Customer, "cust@shop.example")
            .unwrap();

        let response = app.oneshot(admin_request(Some(&token))).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_valid_cookie_admitted() {
        let app = app(RateLimitConfig::default());
        let codec = TokenCodec::new(SECRET).unwrap();

        let token = codec.sign("admin", Role::Admin, ADMIN_EMAIL).unwrap();

        let response = app.oneshot(admin_request(Some(&token))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["subject"], "admin");
        assert_eq!(body["role"], "ADMIN");
    }

    #[tokio::test]
    async fn test_admin_routes_throttled_by_api_policy() {
        let mut rate_limit = RateLimitConfig::default();
        rate_limit.api.limit = 3;
        rate_limit.api.window_secs = 60;
        let app = app(rate_limit);

        let codec = TokenCodec::new(SECRET).unwrap();
        let token = codec.sign("admin", Role::Admin, ADMIN_EMAIL).unwrap();

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(admin_request(Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(admin_request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_login_validation_issues() {
        let app = app(RateLimitConfig::default());

        let response = app
            .oneshot(login_request("203.0.113.7", "not-an-email", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation failed");
        assert!(body["issues"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn test_health_not_throttled() {
        let mut rate_limit = RateLimitConfig::default();
        rate_limit.api.limit = 1;
        let app = app(rate_limit);

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/health")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let app = app(RateLimitConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = app(RateLimitConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
