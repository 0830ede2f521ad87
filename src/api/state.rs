//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::auth::{AdminUserRepository, PasswordHasher, TokenCodec};
use crate::infrastructure::rate_limit::AdmissionController;

/// Shared services behind the gate's endpoints and middleware
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub token_codec: Arc<TokenCodec>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub users: Arc<dyn AdminUserRepository>,
    /// Mark the session cookie `Secure`; disabled only in development.
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(
        admission: Arc<AdmissionController>,
        token_codec: Arc<TokenCodec>,
        password_hasher: Arc<dyn PasswordHasher>,
        users: Arc<dyn AdminUserRepository>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            admission,
            token_codec,
            password_hasher,
            users,
            cookie_secure,
        }
    }
}
