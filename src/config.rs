//! Job configuration.
//!
//! Loaded from an optional TOML file; every field has a default matching the
//! production layout, so an empty file (or no file) is a valid config.
//! Command-line flags override individual values after loading.
//!
//! ```toml
//! [storage]
//! backend = "s3"
//! bucket = "spotify-project-st"
//!
//! [crawler]
//! name = "spotify_crawler_1"
//! max_attempts = 3
//! retry_delay_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawler::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub layout: LayoutConfig,
    pub crawler: CrawlerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Directories under `local_root`, one per bucket
    Local,
    /// Amazon S3 or an S3-compatible endpoint
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Root directory for the local backend
    pub local_root: PathBuf,
    /// AWS region override (falls back to the provider chain)
    pub region: Option<String>,
    /// Custom S3 endpoint (MinIO, LocalStack)
    pub endpoint_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: "spotify-project-st".to_string(),
            local_root: PathBuf::from("."),
            region: None,
            endpoint_url: None,
        }
    }
}

/// Key prefixes inside the bucket. Each ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pending raw payloads
    pub input_prefix: String,
    /// Where raw payloads are moved after a successful transform
    pub processed_prefix: String,
    /// Root of the `{table}_data/` output directories
    pub output_prefix: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            input_prefix: "raw_data/to_processed/".to_string(),
            processed_prefix: "raw_data/processed/".to_string(),
            output_prefix: "transformed_data/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Set to false to skip the catalog refresh entirely
    pub enabled: bool,
    pub name: String,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "spotify_crawler_1".to_string(),
            max_attempts: 3,
            retry_delay_secs: 10,
        }
    }
}

impl CrawlerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}
