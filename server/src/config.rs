//! Configuration management for the server.

use finance_engine::{CacheKeys, DEFAULT_ALL_KEY, DEFAULT_INDEX_NAME, DEFAULT_KEY_PREFIX};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Redis connection URL
    pub redis_url: String,
    /// Cache key scheme for single accounts and the collection snapshot
    pub cache_keys: CacheKeys,
    pub opensearch: OpenSearchConfig,
}

/// Connection settings for the search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Index holding account documents
    pub index: String,
    /// Accept self-signed certificates
    pub insecure: bool,
}

impl OpenSearchConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host = var("HTTP_HOST", "0.0.0.0");

        let port = var("HTTP_PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidPort("HTTP_PORT"))?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;

        let redis_url = var("REDIS_URL", "redis://127.0.0.1:6379");

        let cache_keys = CacheKeys::new(
            var("CACHE_KEY_PREFIX", DEFAULT_KEY_PREFIX),
            var("CACHE_KEY_ALL", DEFAULT_ALL_KEY),
        )
        .map_err(|e| ConfigError::InvalidCacheKeys(e.to_string()))?;

        let opensearch = OpenSearchConfig {
            scheme: var("OPENSEARCH_SCHEME", "https"),
            host: var("OPENSEARCH_HOST", "localhost"),
            port: var("OPENSEARCH_PORT", "9200")
                .parse()
                .map_err(|_| ConfigError::InvalidPort("OPENSEARCH_PORT"))?,
            username: lookup("OPENSEARCH_USER"),
            password: lookup("OPENSEARCH_PASSWORD"),
            index: var("OPENSEARCH_INDEX", DEFAULT_INDEX_NAME),
            insecure: parse_bool(&var("OPENSEARCH_INSECURE", "true"))
                .ok_or(ConfigError::InvalidFlag("OPENSEARCH_INSECURE"))?,
        };

        Ok(Self {
            host,
            port,
            database_url,
            redis_url,
            cache_keys,
            opensearch,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid {0} value")]
    InvalidPort(&'static str),

    #[error("Invalid {0} value, expected true or false")]
    InvalidFlag(&'static str),

    #[error("Invalid cache keys: {0}")]
    InvalidCacheKeys(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/finance")]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.cache_keys, CacheKeys::default());
        assert_eq!(config.opensearch.base_url(), "https://localhost:9200");
        assert_eq!(config.opensearch.index, "accounts");
        assert!(config.opensearch.insecure);
        assert_eq!(config.opensearch.username, None);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/finance"),
            ("HTTP_HOST", "127.0.0.1"),
            ("HTTP_PORT", "8080"),
            ("CACHE_KEY_PREFIX", "fin"),
            ("CACHE_KEY_ALL", "fin_all"),
            ("OPENSEARCH_SCHEME", "http"),
            ("OPENSEARCH_HOST", "search"),
            ("OPENSEARCH_PORT", "9201"),
            ("OPENSEARCH_USER", "admin"),
            ("OPENSEARCH_PASSWORD", "secret"),
            ("OPENSEARCH_INSECURE", "false"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_keys.account(3), "fin:3");
        assert_eq!(config.cache_keys.all(), "fin_all");
        assert_eq!(config.opensearch.base_url(), "http://search:9201");
        assert_eq!(config.opensearch.username.as_deref(), Some("admin"));
        assert!(!config.opensearch.insecure);
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn rejects_bad_values() {
        let db = ("DATABASE_URL", "postgres://db/finance");
        assert!(matches!(
            load(&[db, ("HTTP_PORT", "http")]),
            Err(ConfigError::InvalidPort("HTTP_PORT"))
        ));
        assert!(matches!(
            load(&[db, ("OPENSEARCH_PORT", "70000")]),
            Err(ConfigError::InvalidPort("OPENSEARCH_PORT"))
        ));
        assert!(matches!(
            load(&[db, ("OPENSEARCH_INSECURE", "maybe")]),
            Err(ConfigError::InvalidFlag(_))
        ));
        assert!(matches!(
            load(&[db, ("CACHE_KEY_ALL", "accounts:1")]),
            Err(ConfigError::InvalidCacheKeys(_))
        ));
    }
}
