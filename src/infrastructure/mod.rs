//! Infrastructure layer - counter stores, credentials, logging

pub mod auth;
pub mod client_ip;
pub mod logging;
pub mod rate_limit;

pub use auth::{Argon2Hasher, PasswordHasher, TokenCodec};
pub use client_ip::resolve_client_identity;
pub use rate_limit::{
    AdmissionController, AdmissionDecision, MemoryRateLimitStore, RateLimitPolicy, RateLimitStore,
    RedisRateLimitStore,
};
