//! Session credential signing and verification
//!
//! Credentials are compact HS256 tokens over `{sub, role, email, iat,
//! exp}` with a fixed seven-day validity. There is no revocation store:
//! a credential stays valid until natural expiry, and role changes only
//! take effect once the holder re-authenticates.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::config::MIN_TOKEN_SECRET_BYTES;
use crate::domain::{GatewayError, Identity, Role};

/// Name of the cookie carrying the session credential
pub const SESSION_COOKIE: &str = "storefront_session";

/// Fixed credential validity: 7 days
pub const TOKEN_TTL_SECS: i64 = 604_800;

/// Signed claims inside a session credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    pub email: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl SessionClaims {
    fn new(subject: &str, role: Role, email: &str) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.to_string(),
            role,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECS)).timestamp(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject: self.sub.clone(),
            role: self.role,
            email: self.email.clone(),
        }
    }
}

/// Signs and verifies session credentials
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec from the signing secret. Secrets below the entropy
    /// floor are refused regardless of environment.
    pub fn new(secret: &str) -> Result<Self, GatewayError> {
        if secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(GatewayError::configuration(format!(
                "Token secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Sign a credential for an authenticated user.
    pub fn sign(&self, subject: &str, role: Role, email: &str) -> Result<String, GatewayError> {
        let claims = SessionClaims::new(subject, role, email);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::internal(format!("Failed to sign credential: {}", e)))
    }

    /// Verify a credential and return its claims.
    ///
    /// Any failure (malformed token, signature mismatch, expiry) yields
    /// `None`; callers must treat the absence of claims as untrusted and
    /// cannot distinguish the failure modes.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}
