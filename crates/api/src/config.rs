//! Application configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

/// Configuration values that could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Deployment environment. Controls how much error detail leaves the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    Development,
    #[default]
    Production,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `APP_ENV`: `development` or `production` (default: `production`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `CACHE_TTL_SECS`: query cache lifetime (default: `30`)
/// - `SLOW_QUERY_MS`: slow query warning threshold (default: `200`)
/// - `CORS_ORIGIN`: allowed origin; any origin when unset
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub app_env: AppEnv,
    pub database_url: Option<String>,
    pub cache_ttl: Duration,
    pub slow_query_threshold: Duration,
    pub cors_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", var("PORT"), "a port number", defaults.port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT") {
                None => defaults.log_format,
                Some(v) => match v.to_ascii_lowercase().as_str() {
                    "text" => LogFormat::Text,
                    "json" => LogFormat::Json,
                    _ => return Err(invalid("LOG_FORMAT", "text or json", v)),
                },
            },
            app_env: match var("APP_ENV") {
                None => defaults.app_env,
                Some(v) => match v.to_ascii_lowercase().as_str() {
                    "development" | "dev" => AppEnv::Development,
                    "production" | "prod" => AppEnv::Production,
                    _ => return Err(invalid("APP_ENV", "development or production", v)),
                },
            },
            database_url: var("DATABASE_URL"),
            cache_ttl: Duration::from_secs(parse_or(
                "CACHE_TTL_SECS",
                var("CACHE_TTL_SECS"),
                "a number of seconds",
                defaults.cache_ttl.as_secs(),
            )?),
            slow_query_threshold: Duration::from_millis(parse_or(
                "SLOW_QUERY_MS",
                var("SLOW_QUERY_MS"),
                "a number of milliseconds",
                u64::try_from(defaults.slow_query_threshold.as_millis()).unwrap_or(u64::MAX),
            )?),
            cors_origin: var("CORS_ORIGIN"),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            app_env: AppEnv::Production,
            database_url: None,
            cache_ttl: application::DEFAULT_CACHE_TTL,
            slow_query_threshold: store::postgres::DEFAULT_SLOW_QUERY_THRESHOLD,
            cors_origin: None,
        }
    }
}

fn invalid(var: &'static str, expected: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value,
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| invalid(name, expected, value)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.app_env, AppEnv::Production);
        assert!(config.database_url.is_none());
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.slow_query_threshold, Duration::from_millis(200));
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("APP_ENV", "development"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("CACHE_TTL_SECS", "5"),
            ("SLOW_QUERY_MS", "50"),
            ("CORS_ORIGIN", "http://localhost:5173"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.is_development());
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/catalog")
        );
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.slow_query_threshold, Duration::from_millis(50));
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:5173"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = from_pairs(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(from_pairs(&[("PORT", "eighty")]).is_err());
        assert!(from_pairs(&[("LOG_FORMAT", "xml")]).is_err());

        let err = from_pairs(&[("CACHE_TTL_SECS", "-1")]).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECS"));
    }

    #[test]
    fn test_addr_default() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }
}
