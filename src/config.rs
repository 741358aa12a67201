use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{GmailError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub mime: MimeConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    /// Burst capacity; defaults to `requests_per_second` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_capacity: Option<f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_capacity: None,
        }
    }
}

impl RateLimitConfig {
    pub fn capacity(&self) -> f64 {
        self.burst_capacity.unwrap_or(self.requests_per_second)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_wait_secs")]
    pub base_wait_secs: f64,
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_wait_secs: default_base_wait_secs(),
            retryable_statuses: default_retryable_statuses(),
        }
    }
}

impl RetryConfig {
    pub fn base_wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_wait_secs.min(MAX_BASE_WAIT_SECS)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_messages_in_memory")]
    pub max_messages_in_memory: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_messages_in_memory: default_max_messages_in_memory(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MimeConfig {
    #[serde(default = "default_max_mime_depth")]
    pub max_depth: usize,
}

impl Default for MimeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_mime_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Upper bound on messages written by one export; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,
}

fn default_requests_per_second() -> f64 {
    25.0
}

fn default_max_retries() -> u32 {
    3
}

/// Upper bound on `retry.base_wait_secs`
pub const MAX_BASE_WAIT_SECS: f64 = 3600.0;

fn default_base_wait_secs() -> f64 {
    2.0
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503]
}

fn default_max_pages() -> usize {
    1000
}

fn default_max_messages_in_memory() -> usize {
    10_000
}

/// Gmail's maximum page size for messages.list
fn default_page_size() -> u32 {
    500
}

fn default_max_mime_depth() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    GmailError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GmailError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let rate = self.rate_limit.requests_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(GmailError::ConfigError(
                "rate_limit.requests_per_second must be a positive number".to_string(),
            ));
        }
        if let Some(capacity) = self.rate_limit.burst_capacity {
            if !capacity.is_finite() || capacity < 1.0 {
                return Err(GmailError::ConfigError(
                    "rate_limit.burst_capacity must be at least 1".to_string(),
                ));
            }
        }
        // Without at least one whole token the bucket could never grant a request
        if self.rate_limit.capacity() < 1.0 {
            return Err(GmailError::ConfigError(
                "rate_limit.requests_per_second must be at least 1 when burst_capacity is unset"
                    .to_string(),
            ));
        }

        let base_wait = self.retry.base_wait_secs;
        if !base_wait.is_finite() || base_wait < 0.0 {
            return Err(GmailError::ConfigError(
                "retry.base_wait_secs cannot be negative".to_string(),
            ));
        }
        if base_wait > MAX_BASE_WAIT_SECS {
            return Err(GmailError::ConfigError(format!(
                "retry.base_wait_secs cannot exceed {}",
                MAX_BASE_WAIT_SECS
            )));
        }
        if self.retry.max_retries > 10 {
            return Err(GmailError::ConfigError(
                "retry.max_retries cannot exceed 10".to_string(),
            ));
        }
        for status in &self.retry.retryable_statuses {
            if !(100..=599).contains(status) {
                return Err(GmailError::ConfigError(format!(
                    "retry.retryable_statuses contains invalid HTTP status {}",
                    status
                )));
            }
        }

        if self.pagination.max_pages == 0 {
            return Err(GmailError::ConfigError(
                "pagination.max_pages must be at least 1".to_string(),
            ));
        }
        if self.pagination.max_messages_in_memory == 0 {
            return Err(GmailError::ConfigError(
                "pagination.max_messages_in_memory must be at least 1".to_string(),
            ));
        }
        if self.pagination.page_size == 0 || self.pagination.page_size > 500 {
            return Err(GmailError::ConfigError(
                "pagination.page_size must be between 1 and 500".to_string(),
            ));
        }

        if self.mime.max_depth == 0 {
            return Err(GmailError::ConfigError(
                "mime.max_depth must be at least 1".to_string(),
            ));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(GmailError::ConfigError(
                "api.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.export.max_messages == Some(0) {
            return Err(GmailError::ConfigError(
                "export.max_messages must be greater than 0 when set".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.rate_limit.requests_per_second, 25.0);
        assert_eq!(config.rate_limit.burst_capacity, None);
        assert_eq!(config.rate_limit.capacity(), 25.0);

        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_wait(), Duration::from_secs(2));
        assert_eq!(config.retry.retryable_statuses, vec![429, 500, 502, 503]);

        assert_eq!(config.pagination.max_pages, 1000);
        assert_eq!(config.pagination.max_messages_in_memory, 10_000);
        assert_eq!(config.pagination.page_size, 500);

        assert_eq!(config.mime.max_depth, 50);
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.export.max_messages, None);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_rate_not_positive() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("positive"));
    }

    #[test]
    fn test_config_validation_fractional_rate_needs_capacity() {
        let mut config = Config::default();
        config.rate_limit.requests_per_second = 0.5;
        assert!(config.validate().is_err());

        config.rate_limit.burst_capacity = Some(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_negative_base_wait() {
        let mut config = Config::default();
        config.retry.base_wait_secs = -1.0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("base_wait_secs"));
    }

    #[test]
    fn test_config_validation_huge_base_wait() {
        let mut config = Config::default();
        config.retry.base_wait_secs = 1e20;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot exceed"));
        assert_eq!(
            config.retry.base_wait(),
            Duration::from_secs_f64(MAX_BASE_WAIT_SECS)
        );
    }

    #[test]
    fn test_config_validation_bad_status() {
        let mut config = Config::default();
        config.retry.retryable_statuses.push(999);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("999"));
    }

    #[test]
    fn test_config_validation_page_size_bounds() {
        let mut config = Config::default();
        config.pagination.page_size = 501;
        assert!(config.validate().is_err());

        config.pagination.page_size = 0;
        assert!(config.validate().is_err());

        config.pagination.page_size = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = Config::default();
        config.pagination.max_pages = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pagination.max_messages_in_memory = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.mime.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.max_messages = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [rate_limit]
            requests_per_second = 10.0

            [retry]
            max_retries = 5
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rate_limit.requests_per_second, 10.0);
        assert_eq!(config.rate_limit.capacity(), 10.0);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_wait_secs, 2.0);
        assert_eq!(config.pagination.max_pages, 1000);
        assert_eq!(config.mime.max_depth, 50);
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_defaults() {
        let config = Config::load(Path::new("/nonexistent/gmail-reader.toml"))
            .await
            .unwrap();
        assert_eq!(config.retry.max_retries, 3);
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();

        let mut config = Config::default();
        config.rate_limit.burst_capacity = Some(40.0);
        config.export.max_messages = Some(250);
        config.save(temp_file.path()).await.unwrap();

        let loaded = Config::load(temp_file.path()).await.unwrap();
        assert_eq!(loaded.rate_limit.capacity(), 40.0);
        assert_eq!(loaded.export.max_messages, Some(250));
        assert_eq!(loaded.retry.retryable_statuses, vec![429, 500, 502, 503]);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_values() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[mime]\nmax_depth = 0\n")
            .await
            .unwrap();

        let result = Config::load(temp_file.path()).await;
        assert!(matches!(result, Err(GmailError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[retry\nmax_retries = ")
            .await
            .unwrap();

        let result = Config::load(temp_file.path()).await;
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }
}
