//! User identities as seen by the gate
//!
//! The storefront owns the full user schema; the gate only deals with the
//! slice of it that ends up inside a session credential.

use serde::{Deserialize, Serialize};

/// Role carried by a session credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Customer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Customer => write!(f, "CUSTOMER"),
        }
    }
}

/// A verified identity produced by the trust gate
///
/// Only ever constructed from a credential whose signature and expiry have
/// been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
    pub email: String,
}

/// A login-capable user as stored by the gate's own user seam
///
/// `password_hash` is an Argon2 PHC string; the plaintext never exists
/// outside the login request.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}
