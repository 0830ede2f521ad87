//! Credential infrastructure - hashing and token signing

pub mod password;
pub mod repository;
pub mod token;

pub use password::{Argon2Hasher, PasswordHasher};
pub use repository::{AdminUserRepository, InMemoryAdminUserRepository};
pub use token::{SessionClaims, TokenCodec, SESSION_COOKIE, TOKEN_TTL_SECS};
