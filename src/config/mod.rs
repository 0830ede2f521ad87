pub mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, Environment, LogFormat, LoggingConfig, PolicyConfig, RateLimitConfig,
    RedisRateLimitConfig, ServerConfig, MIN_TOKEN_SECRET_BYTES,
};
