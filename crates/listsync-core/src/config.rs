//! Pipeline configuration.
//!
//! All sections are optional in JSON; missing fields take the `default_v1` values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::app::retry::RetryPolicy;

/// Largest number of change requests the list store accepts in one `$batch`.
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub list_store: ListStoreConfig,
    pub retry: RetryConfig,
    pub sync: SyncConfig,
}

/// Where the remote list store lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListStoreConfig {
    /// Site URL, e.g. `https://tenant.example.com/sites/care`.
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first try (`2` means up to 3 attempts).
    pub retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Proportional jitter in `0.0..=1.0`.
    pub jitter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// List that receives pending entries.
    pub collection: String,
    pub chunk_size: usize,
}

impl PipelineConfig {
    pub fn default_v1() -> Self {
        Self {
            list_store: ListStoreConfig::default(),
            retry: RetryConfig::default(),
            sync: SyncConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.list_store.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Invalid("list_store.base_url is empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "list_store.base_url must be http(s): {base}"
            )));
        }
        if self.sync.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("sync.collection is empty".into()));
        }
        if self.sync.chunk_size == 0 || self.sync.chunk_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "sync.chunk_size must be within 1..={MAX_BATCH_SIZE}, got {}",
                self.sync.chunk_size
            )));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid("retry.multiplier must be >= 1.0".into()));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::Invalid("retry.jitter must be within 0.0..=1.0".into()));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}

impl ListStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ListStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            bearer_token: None,
            timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 8_000,
            jitter: 0.0,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: "AuditLog".to_string(),
            chunk_size: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"list_store": {"base_url": "https://tenant.example.com/sites/care"},
                "sync": {"chunk_size": 20}}"#,
        )
        .unwrap();

        assert_eq!(config.sync.chunk_size, 20);
        assert_eq!(config.sync.collection, "AuditLog");
        assert_eq!(config.retry.retries, 2);
        assert_eq!(config.list_store.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn retry_section_becomes_policy() {
        let policy = RetryConfig {
            retries: 4,
            base_delay_ms: 100,
            ..RetryConfig::default()
        }
        .to_policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
    }

    #[rstest]
    #[case::zero_chunk(r#"{"sync": {"chunk_size": 0}}"#)]
    #[case::oversized_chunk(r#"{"sync": {"chunk_size": 101}}"#)]
    #[case::empty_url(r#"{"list_store": {"base_url": ""}}"#)]
    #[case::ftp_url(r#"{"list_store": {"base_url": "ftp://x"}}"#)]
    #[case::shrinking_backoff(r#"{"retry": {"multiplier": 0.5}}"#)]
    #[case::jitter(r#"{"retry": {"jitter": 2.0}}"#)]
    fn rejects_invalid_values(#[case] json: &str) {
        let err = PipelineConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listsync.json");
        std::fs::write(&path, r#"{"sync": {"collection": "Attendance_Audit"}}"#).unwrap();

        let config = PipelineConfig::from_path(&path).unwrap();
        assert_eq!(config.sync.collection, "Attendance_Audit");
    }
}
