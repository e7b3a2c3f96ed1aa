//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::window::WindowConfig;
use crate::infrastructure::cache::keys;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Use Redis for buckets. When false, buckets live in process memory and
    /// are not shared between instances.
    pub enabled: bool,

    /// Upper bound on one bucket transaction in milliseconds (0 = unbounded)
    pub command_timeout_ms: u64,

    /// TTL refreshed on a bucket at every access, in seconds
    pub key_expiration_secs: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per window
    pub capacity: u32,

    /// Window duration in seconds (1..=3600)
    pub window_secs: u64,

    /// Let requests through when the store fails
    pub grant_on_store_error: bool,

    /// Namespace for bucket keys
    pub key_prefix: String,

    /// Request paths that bypass rate limiting entirely
    pub ignore_paths: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// if the default window is out of range, or if the key expiration does
    /// not outlive the window.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.enabled", true)?
            .set_default("redis.command_timeout_ms", 500)?
            .set_default("redis.key_expiration_secs", 86_400)?
            .set_default("rate_limit.capacity", 20)?
            .set_default("rate_limit.window_secs", 60)?
            .set_default("rate_limit.grant_on_store_error", true)?
            .set_default("rate_limit.key_prefix", keys::RATE_LIMIT)?
            .set_default(
                "rate_limit.ignore_paths",
                vec!["/health", "/health/live", "/health/ready", "/metrics"],
            )?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__RATE_LIMIT__CAPACITY=100 -> rate_limit.capacity = 100
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rate_limit.ignore_paths")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject rate limit settings that could never be served correctly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = self.rate_limit.window()?;
        if self.redis.key_expiration() <= window.duration() {
            return Err(ConfigError::Message(format!(
                "redis.key_expiration_secs ({}) must exceed rate_limit.window_secs ({})",
                self.redis.key_expiration_secs,
                window.duration_secs()
            )));
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl RedisSettings {
    pub fn key_expiration(&self) -> Duration {
        Duration::from_secs(self.key_expiration_secs)
    }

    /// Per-transaction timeout, if one is configured.
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
    }
}

impl RateLimitSettings {
    /// The validated default window.
    pub fn window(&self) -> Result<WindowConfig, ConfigError> {
        WindowConfig::per_seconds(self.capacity, self.window_secs)
            .map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(window_secs: u64, key_expiration_secs: u64) -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 3000,
            },
            redis: RedisSettings {
                url: "redis://127.0.0.1:6379".into(),
                enabled: false,
                command_timeout_ms: 0,
                key_expiration_secs,
            },
            rate_limit: RateLimitSettings {
                capacity: 20,
                window_secs,
                grant_on_store_error: true,
                key_prefix: "rl".into(),
                ignore_paths: vec![],
            },
            environment: "test".into(),
        }
    }

    #[test]
    fn test_valid_settings() {
        let settings = settings(60, 86_400);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rate_limit.window().unwrap().capacity(), 20);
        assert_eq!(settings.server_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_window_out_of_range_is_rejected() {
        let err = settings(7200, 86_400).validate().unwrap_err();
        assert!(err.to_string().contains("between 1 and 3600 seconds"));
    }

    #[test]
    fn test_key_expiration_must_outlive_window() {
        let err = settings(60, 60).validate().unwrap_err();
        assert!(err.to_string().contains("must exceed"));
    }

    #[test]
    fn test_zero_command_timeout_means_unbounded() {
        let settings = settings(60, 86_400);
        assert_eq!(settings.redis.command_timeout(), None);
    }
}
