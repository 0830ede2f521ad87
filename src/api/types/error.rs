//! Wire-level error responses
//!
//! Every failure leaving the gate or a downstream handler is shaped into
//! one envelope: `{error, message, code?, issues?}`. Messages come from a
//! fixed catalog; internal error detail is logged for operators and never
//! serialized to the client.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::domain::GatewayError;

/// One field-level problem inside a validation failure
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// The uniform error envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<ValidationIssue>>,
}

/// API error with status code
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
    /// Window reset time, present only on 429 responses; emitted as
    /// `Retry-After` and `X-RateLimit-Reset` headers.
    reset_at: Option<DateTime<Utc>>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                message: message.into(),
                code: None,
                issues: None,
            },
            reset_at: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.body.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad request", message)
    }

    /// Validation failure with a structured issue list
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        let mut err = Self::new(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            "One or more fields are invalid",
        );
        err.body.issues = Some(issues);
        err
    }

    /// The single 401 shape. Absent, malformed, tampered, and expired
    /// credentials are indistinguishable on the wire.
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication required",
        )
    }

    /// 401 for a failed login attempt
    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Invalid email or password",
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "Forbidden",
            "You do not have permission to perform this action",
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found", message)
    }

    /// Uniqueness conflicts surface a generic message; the colliding
    /// value is never echoed back.
    pub fn conflict() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Conflict",
            "A resource with these attributes already exists",
        )
    }

    /// 429 with retry metadata
    pub fn rate_limited(reset_at: DateTime<Utc>) -> Self {
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests",
            "Rate limit exceeded. Please try again later.",
        );
        err.reset_at = Some(reset_at);
        err
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            "An unexpected error occurred",
        )
    }

    pub fn unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service unavailable",
            "The service is temporarily unavailable. Please try again later.",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(&self.body)).into_response();

        if let Some(reset_at) = self.reset_at {
            let retry_after = (reset_at - Utc::now()).num_seconds().max(0);
            let headers = response.headers_mut();

            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert(header::RETRY_AFTER, value);
            }
            if let Ok(value) = HeaderValue::from_str(&reset_at.timestamp_millis().to_string()) {
                headers.insert("x-ratelimit-reset", value);
            }
        }

        response
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::NotFound { message } => Self::not_found(message),
            GatewayError::Validation { message } => Self::bad_request(message),
            GatewayError::Conflict { message } => {
                debug!(detail = %message, "Conflict rejected");
                Self::conflict()
            }
            GatewayError::Credential { .. } => Self::unauthorized(),
            GatewayError::StoreUnavailable { .. } => {
                error!(error = %err, "Rate limit store failure");
                Self::unavailable()
            }
            GatewayError::Configuration { .. } | GatewayError::Internal { .. } => {
                error!(error = %err, "Internal error");
                Self::internal()
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.body.error, self.body.message)
    }
}

impl std::error::Error for ApiError {}
