//! Login-capable user lookup
//!
//! The storefront's full user table lives behind its own persistence
//! engine; the gate only needs to resolve a login email to a stored hash
//! and role. The in-memory implementation is seeded from configuration
//! and covers single-admin deployments and tests.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::config::AuthConfig;
use crate::domain::{GatewayError, Role, StoredUser};

/// Lookup seam for users that may log in through the gate
#[async_trait]
pub trait AdminUserRepository: Send + Sync + Debug {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, GatewayError>;
}

/// Config-seeded user store
#[derive(Debug, Default)]
pub struct InMemoryAdminUserRepository {
    users: Vec<StoredUser>,
}

impl InMemoryAdminUserRepository {
    pub fn new(users: Vec<StoredUser>) -> Self {
        Self { users }
    }

    /// Seed from `auth.admin_email` / `auth.admin_password_hash`. An
    /// unset pair yields an empty store: every login fails, the gate
    /// still runs.
    pub fn from_config(config: &AuthConfig) -> Self {
        let users = match (&config.admin_email, &config.admin_password_hash) {
            (Some(email), Some(hash)) => vec![StoredUser {
                id: "admin".to_string(),
                email: email.clone(),
                password_hash: hash.clone(),
                role: Role::Admin,
            }],
            _ => Vec::new(),
        };

        Self { users }
    }
}

#[async_trait]
impl AdminUserRepository for InMemoryAdminUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, GatewayError> {
        Ok(self
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
