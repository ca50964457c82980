//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound on retries after the first attempt.
const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `http_timeout` is below 0.1s, above 5 minutes, or not finite
    /// - `http_max_retries` exceeds 10
    /// - the retry delays are zero or the base exceeds the cap
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.http_timeout.is_finite() || self.http_timeout < 0.1 {
            return Err(ConfigError::Invalid { field: "http_timeout".into(), reason: "must be at least 0.1s".into() });
        }
        if self.http_timeout > 300.0 {
            return Err(ConfigError::Invalid {
                field: "http_timeout".into(),
                reason: "must not exceed 5 minutes (300s)".into(),
            });
        }

        if self.http_max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid {
                field: "http_max_retries".into(),
                reason: format!("must not exceed {MAX_RETRIES_LIMIT}"),
            });
        }

        if self.http_retry_max_delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "http_retry_max_delay_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.http_retry_base_delay_ms > self.http_retry_max_delay_ms {
            return Err(ConfigError::Invalid {
                field: "http_retry_base_delay_ms".into(),
                reason: "must not exceed http_retry_max_delay_ms".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !self.http_verify_ssl {
            tracing::warn!("TLS certificate verification is disabled for outbound fetches");
        }

        Ok(())
    }
}
