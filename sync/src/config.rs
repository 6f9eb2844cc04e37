//! Configuration management for the sync runtime.

use crate::error::{Result, SyncError};
use masterdata_engine::{BaseDataset, DEFAULT_CATEGORIES};
use std::env;
use std::path::PathBuf;

/// Local cache key and remote row key of the serialized change log.
pub const DEFAULT_CHANGES_KEY: &str = "master_data_changes_v1";

/// Remote key prefix of the per-category base chunks.
pub const DEFAULT_BASE_PREFIX: &str = "master_data_base_v1_";

/// Default directory of the file cache.
pub const DEFAULT_CACHE_DIR: &str = ".masterdata";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Directory of the local durable cache
    pub cache_dir: PathBuf,
    /// Base URL of the remote store service; `None` runs offline-only
    pub remote_url: Option<String>,
    /// Bearer token for the remote store service
    pub auth_token: Option<String>,
    /// Fixed key of the change log, locally and remotely
    pub changes_key: String,
    /// Prefix of remote base chunk keys
    pub base_prefix: String,
    /// JSON file holding the bundled base dataset
    pub bundled_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            remote_url: None,
            auth_token: None,
            changes_key: DEFAULT_CHANGES_KEY.to_string(),
            base_prefix: DEFAULT_BASE_PREFIX.to_string(),
            bundled_path: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_dir = var("MASTERDATA_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let remote_url = match var("MASTERDATA_REMOTE_URL").filter(|u| !u.is_empty()) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.trim_end_matches('/').to_string())
            }
            Some(url) => return Err(ConfigError::InvalidRemoteUrl(url)),
            None => None,
        };

        let auth_token = var("MASTERDATA_AUTH_TOKEN").filter(|t| !t.is_empty());

        let changes_key = var("MASTERDATA_CHANGES_KEY").unwrap_or(defaults.changes_key);
        if changes_key.is_empty() {
            return Err(ConfigError::EmptyChangesKey);
        }

        let base_prefix = var("MASTERDATA_BASE_PREFIX").unwrap_or(defaults.base_prefix);
        if base_prefix.is_empty() {
            return Err(ConfigError::EmptyBasePrefix);
        }

        let bundled_path = var("MASTERDATA_BUNDLED_PATH").map(PathBuf::from);

        Ok(Self {
            cache_dir,
            remote_url,
            auth_token,
            changes_key,
            base_prefix,
            bundled_path,
        })
    }

    /// Read the bundled base dataset, or an empty one if none is configured.
    /// Default categories are always present.
    pub fn load_bundled(&self) -> Result<BaseDataset> {
        let base = match &self.bundled_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| SyncError::Bundled(format!("{}: {}", path.display(), e)))?;
                BaseDataset::from_json(&json)?
            }
            None => BaseDataset::new(),
        };
        Ok(base.ensure_categories(DEFAULT_CATEGORIES))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MASTERDATA_REMOTE_URL must be an http(s) URL, got '{0}'")]
    InvalidRemoteUrl(String),

    #[error("MASTERDATA_CHANGES_KEY must not be empty")]
    EmptyChangesKey,

    #[error("MASTERDATA_BASE_PREFIX must not be empty")]
    EmptyBasePrefix,
}
