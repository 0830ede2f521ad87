//! Client identity resolution for rate-limit keying
//!
//! The resolved value is an opaque counter key, never an authorization
//! input, so no IP syntax validation is performed.

use axum::http::{header, HeaderMap};

/// Fallback identity when no usable header is present
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive a stable client identifier from request headers.
///
/// Priority order: first entry of `X-Forwarded-For` (the proxy chain's
/// original client), then `X-Real-IP`, then `Host`, then `"unknown"`.
pub fn resolve_client_identity(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    if let Some(host) = headers.get(header::HOST) {
        if let Ok(value) = host.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    UNKNOWN_CLIENT.to_string()
}
