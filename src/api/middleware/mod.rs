//! API middleware components

pub mod admin_auth;
pub mod rate_limit;
pub mod security;

pub use admin_auth::{authenticate, require_role, RequireAdmin, RequireSession};
pub use rate_limit::{
    create_rate_limit_response, rate_limit_api, rate_limit_login, rate_limit_search,
};
pub use security::security_headers_middleware;
