use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use crate::core::FeedSettings;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub feed: FeedConfig,
    pub scoring: ScoringSettings,
    pub realtime: RealtimeSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

/// Postgres settings; without a url the in-process store is used
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
    pub l1_cache_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: 3600,
            l1_cache_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub default_limit: u32,
    pub max_limit: u32,
    pub deadline_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            deadline_ms: 5000,
        }
    }
}

impl FeedConfig {
    pub fn to_settings(&self) -> FeedSettings {
        FeedSettings {
            default_limit: self.default_limit.max(1),
            max_limit: self.max_limit.max(1),
            deadline: Duration::from_millis(self.deadline_ms),
        }
    }
}

/// External scoring engine; without an endpoint the periodic refresh is off
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub batch_size: u32,
    pub top_n: u32,
    pub refresh_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            batch_size: 50,
            top_n: 100,
            refresh_interval_secs: 900,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    pub channel_capacity: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

/// Development-only signing secret; refused once a database is configured
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

impl AuthSettings {
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret.trim().is_empty() || self.jwt_secret == DEV_JWT_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the structs
    /// 2. Configuration files (config/default, config/local)
    /// 3. Environment variables (prefixed with CROTCHET__)
    /// 4. DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., CROTCHET__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        let settings = substitute_env_vars(settings)?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that must not reach a running server
    ///
    /// The development JWT secret is public, so it is only accepted with the
    /// in-process store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_some() && self.auth.uses_dev_secret() {
            return Err(ConfigError::Message(
                "auth.jwt_secret must be set when database.url is configured".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CROTCHET")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply DATABASE_URL, the conventional variable for sqlx tooling
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        _ => Ok(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_runnable() {
        let settings = Settings::default();
        assert!(settings.database.url.is_none());
        assert!(settings.cache.redis_url.is_none());
        assert!(settings.scoring.endpoint.is_none());
        assert_eq!(settings.feed.default_limit, 20);
        assert_eq!(settings.feed.max_limit, 100);
        assert_eq!(settings.scoring.batch_size, 50);
        assert_eq!(settings.scoring.top_n, 100);
        assert_eq!(settings.realtime.channel_capacity, 256);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let settings: Settings = Config::builder()
            .set_override("server.port", 9090)
            .unwrap()
            .set_override("feed.deadline_ms", 250)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.feed.to_settings().deadline, Duration::from_millis(250));
        assert_eq!(settings.scoring.refresh_interval_secs, 900);
    }

    #[test]
    fn test_dev_secret_rejected_with_database() {
        let mut settings = Settings::default();
        assert!(settings.auth.uses_dev_secret());
        assert!(settings.validate().is_ok());

        settings.database.url = Some("postgres://localhost/crotchet".to_string());
        assert!(matches!(settings.validate(), Err(ConfigError::Message(_))));

        settings.auth.jwt_secret = "   ".to_string();
        assert!(settings.validate().is_err());

        settings.auth.jwt_secret = "a-real-deployment-secret".to_string();
        assert!(!settings.auth.uses_dev_secret());
        assert!(settings.validate().is_ok());
    }
}
