use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default session TTL: one hour.
pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

/// Default part size for chunked uploads (5 MiB, the usual multipart minimum).
pub const DEFAULT_PART_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Well-known record store key holding the serialized upload registry.
pub const DEFAULT_REGISTRY_KEY: &str = "rum/upload-registry";

/// Retry policy parameters for part transfers (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per part (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/rum/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RumConfig {
    /// Age (seconds) after which a cached session is neither resumed nor kept.
    pub ttl_secs: u64,
    /// Part size used when splitting a payload into multipart chunks.
    pub part_size_bytes: u64,
    /// Record store key the upload registry is written under.
    pub registry_key: String,
    /// Root directory of the local multipart store (None = XDG data dir).
    #[serde(default)]
    pub store_root: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for RumConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            part_size_bytes: DEFAULT_PART_SIZE_BYTES,
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
            store_root: None,
            retry: None,
        }
    }
}

impl RumConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }

    /// Configured store root, or `~/.local/share/rum/store`.
    pub fn resolved_store_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.store_root {
            return Ok(root.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("rum")?;
        Ok(xdg_dirs.get_data_home().join("store"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rum")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RumConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RumConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: RumConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
