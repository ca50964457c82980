//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Unprefixed environment variables (`HTTP_TIMEOUT`, `HTTP_MAX_RETRIES`, ...)
//! 2. Environment variables (INVENTORY_*)
//! 3. TOML config file (if INVENTORY_CONFIG_FILE set)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Variables read without the `INVENTORY_` prefix.
const UNPREFIXED_KEYS: &[&str] = &["http_timeout", "http_max_retries", "http_verify_ssl", "log_level"];

/// Which repository backend to construct at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file at `db_path`.
    #[default]
    Sqlite,
    /// Process-local map, lost on exit.
    Memory,
}

/// How a 5xx response is classified by the fetch client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerErrorPolicy {
    /// A 5xx response is a completed fetch and is stored like any other status.
    #[default]
    Record,
    /// A 5xx response is a transient failure and is retried.
    Retry,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. `HTTP_TIMEOUT`, `HTTP_MAX_RETRIES`, `HTTP_VERIFY_SSL`, `LOG_LEVEL`
/// 2. Environment variables (INVENTORY_*)
/// 3. TOML config file (if INVENTORY_CONFIG_FILE set)
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite database.
    ///
    /// Set via INVENTORY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Repository backend.
    ///
    /// Set via INVENTORY_STORE_BACKEND (`sqlite` or `memory`).
    #[serde(default)]
    pub store_backend: StoreBackend,

    /// User-Agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-attempt deadline in seconds.
    ///
    /// Set via HTTP_TIMEOUT or INVENTORY_HTTP_TIMEOUT.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: f64,

    /// Retries after the first attempt before a URL is declared unreachable.
    ///
    /// Set via HTTP_MAX_RETRIES or INVENTORY_HTTP_MAX_RETRIES.
    #[serde(default = "default_http_max_retries")]
    pub http_max_retries: u32,

    /// Delay before the first retry, in milliseconds. Doubles on each retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub http_retry_base_delay_ms: u64,

    /// Upper bound on a single backoff delay, in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub http_retry_max_delay_ms: u64,

    /// Whether TLS certificates are verified. Disable behind intercepting proxies.
    #[serde(default = "default_true")]
    pub http_verify_ssl: bool,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub http_max_redirects: usize,

    /// Maximum bytes of page source kept per document.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Classification of 5xx responses.
    #[serde(default)]
    pub server_error_policy: ServerErrorPolicy,

    /// Fallback tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./metadata-inventory.sqlite")
}

fn default_user_agent() -> String {
    "MetadataInventoryBot/1.0".into()
}

fn default_http_timeout() -> f64 {
    10.0
}

fn default_http_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            store_backend: StoreBackend::default(),
            user_agent: default_user_agent(),
            http_timeout: default_http_timeout(),
            http_max_retries: default_http_max_retries(),
            http_retry_base_delay_ms: default_retry_base_delay_ms(),
            http_retry_max_delay_ms: default_retry_max_delay_ms(),
            http_verify_ssl: true,
            http_max_redirects: default_max_redirects(),
            max_bytes: default_max_bytes(),
            server_error_policy: ServerErrorPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Per-attempt timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.http_timeout)
    }

    /// Delay before the first retry.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.http_retry_base_delay_ms)
    }

    /// Cap on any single retry delay.
    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.http_retry_max_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("INVENTORY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment
            .merge(
                Env::prefixed("INVENTORY_")
                    .map(|key| key.as_str().to_lowercase().into())
                    .split("__"),
            )
            .merge(
                Env::raw()
                    .only(UNPREFIXED_KEYS)
                    .map(|key| key.as_str().to_lowercase().into()),
            );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` when extraction fails and
    /// `ConfigError::Invalid` when validation rejects a value.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./metadata-inventory.sqlite"));
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.user_agent, "MetadataInventoryBot/1.0");
        assert_eq!(config.http_timeout, 10.0);
        assert_eq!(config.http_max_retries, 3);
        assert!(config.http_verify_ssl);
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.server_error_policy, ServerErrorPolicy::Record);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_base_delay(), Duration::from_millis(500));
        assert_eq!(config.retry_max_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_figment_toml_overrides() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(
            r#"
            http_timeout = 2.5
            http_max_retries = 1
            store_backend = "memory"
            server_error_policy = "retry"
            "#,
        ));

        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.http_max_retries, 1);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.server_error_policy, ServerErrorPolicy::Retry);
        assert_eq!(config.user_agent, "MetadataInventoryBot/1.0");
    }

    #[test]
    fn test_from_figment_rejects_invalid() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("http_timeout = 0.0"));
        let result = AppConfig::from_figment(figment);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "http_timeout"));
    }

    #[test]
    fn test_load_unprefixed_env_outranks_prefixed() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INVENTORY_HTTP_TIMEOUT", "5.0");
            jail.set_env("INVENTORY_HTTP_MAX_RETRIES", "1");
            jail.set_env("HTTP_TIMEOUT", "2.0");
            jail.set_env("HTTP_MAX_RETRIES", "7");
            jail.set_env("HTTP_VERIFY_SSL", "false");
            jail.set_env("LOG_LEVEL", "debug");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.timeout(), Duration::from_secs(2));
            assert_eq!(config.http_max_retries, 7);
            assert!(!config.http_verify_ssl);
            assert_eq!(config.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_load_layers_file_then_prefixed_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "inventory.toml",
                r#"
                user_agent = "FileBot/2.0"
                http_max_redirects = 2
                store_backend = "memory"
                "#,
            )?;
            jail.set_env("INVENTORY_CONFIG_FILE", "inventory.toml");
            jail.set_env("INVENTORY_HTTP_MAX_REDIRECTS", "9");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.user_agent, "FileBot/2.0");
            assert_eq!(config.store_backend, StoreBackend::Memory);
            assert_eq!(config.http_max_redirects, 9);
            assert_eq!(config.http_max_retries, 3);
            Ok(())
        });
    }

    #[test]
    fn test_from_figment_bad_type() {
        let figment =
            Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string("http_max_retries = \"many\""));
        let result = AppConfig::from_figment(figment);
        assert!(matches!(result, Err(ConfigError::LoadFailed(_))));
    }
}
