use serde::Deserialize;

use crate::domain::GatewayError;

/// Minimum length of the credential signing secret, in bytes
pub const MIN_TOKEN_SECRET_BYTES: usize = 32;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Credential configuration
///
/// `token_secret` signs session credentials and is mandatory outside
/// development. `admin_email` / `admin_password_hash` seed the gate's
/// built-in admin user; the hash is an Argon2 PHC string produced out of
/// band.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
}

/// Rate limit configuration
///
/// Backend selection is the presence of `redis`: configured, the
/// distributed sliding-window backend is used for the whole process
/// lifetime; absent, the in-memory fixed-window fallback is used. The
/// choice is made once at startup and never switches mid-process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub redis: Option<RedisRateLimitConfig>,
    pub login: PolicyConfig,
    pub api: PolicyConfig,
    pub search: PolicyConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            redis: None,
            login: PolicyConfig::login_default(),
            api: PolicyConfig::api_default(),
            search: PolicyConfig::search_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisRateLimitConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing counters
    pub key_prefix: String,
}

impl Default for RedisRateLimitConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "ratelimit".to_string(),
        }
    }
}

/// Per-policy limit parameters, fixed per deployment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub limit: u32,
    pub window_secs: u64,
    /// Admit requests when the backend is unreachable. Never valid for the
    /// login policy.
    pub fail_open: bool,
}

impl PolicyConfig {
    /// Narrow limit, long window: credential-guessing defense
    fn login_default() -> Self {
        Self {
            limit: 5,
            window_secs: 900,
            fail_open: false,
        }
    }

    /// Broad limit, short window: general abuse defense
    fn api_default() -> Self {
        Self {
            limit: 100,
            window_secs: 60,
            fail_open: false,
        }
    }

    fn search_default() -> Self {
        Self {
            limit: 30,
            window_secs: 60,
            fail_open: false,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::api_default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Enforce the startup invariants the gate refuses to run without:
    /// a signing secret of at least 32 bytes outside development, and a
    /// fail-closed login policy everywhere.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match &self.auth.token_secret {
            Some(secret) if secret.len() < MIN_TOKEN_SECRET_BYTES => {
                return Err(GatewayError::configuration(format!(
                    "auth.token_secret must be at least {} bytes",
                    MIN_TOKEN_SECRET_BYTES
                )));
            }
            Some(_) => {}
            None if self.environment == Environment::Production => {
                return Err(GatewayError::configuration(
                    "auth.token_secret is required in production",
                ));
            }
            None => {}
        }

        if self.rate_limit.login.fail_open {
            return Err(GatewayError::configuration(
                "rate_limit.login.fail_open is not permitted; the login policy is fail-closed",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.rate_limit.login.limit, 5);
        assert_eq!(config.rate_limit.login.window_secs, 900);
        assert_eq!(config.rate_limit.api.limit, 100);
        assert_eq!(config.rate_limit.api.window_secs, 60);
        assert_eq!(config.rate_limit.search.limit, 30);
        assert_eq!(config.rate_limit.search.window_secs, 60);
        assert!(!config.rate_limit.login.fail_open);
    }

    #[test]
    fn test_missing_secret_allowed_in_development() {
        let config = AppConfig::default();

        assert_eq!(config.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_rejected_in_production() {
        let mut config = AppConfig::default();
        config.environment = Environment::Production;

        let result = config.validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_short_secret_rejected_everywhere() {
        let mut config = AppConfig::default();
        config.auth.token_secret = Some("too-short".to_string());

        assert!(config.validate().is_err());

        config.environment = Environment::Production;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_secret_accepted() {
        let mut config = AppConfig::default();
        config.auth.token_secret = Some("0123456789abcdef0123456789abcdef".to_string());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fail_open_login_rejected() {
        let mut config = AppConfig::default();
        config.rate_limit.login.fail_open = true;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fail_open_other_policies_allowed() {
        let mut config = AppConfig::default();
        config.rate_limit.api.fail_open = true;
        config.rate_limit.search.fail_open = true;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_deserialization() {
        let env: Environment = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(env, Environment::Production);
    }
}
