//! Pacer configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for the batch scheduler and transport session
///
/// Defaults give the stock cadence: batches of 3-5 requests, a 5-10 second
/// randomized pause between batches, and a 1 second bounded wait when
/// draining the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Smallest batch-size target the scheduler may draw
    #[serde(rename = "batch-size-min")]
    pub batch_size_min: usize,

    /// Largest batch-size target the scheduler may draw
    #[serde(rename = "batch-size-max")]
    pub batch_size_max: usize,

    /// Lower bound of the randomized pause between batches, in milliseconds
    #[serde(rename = "batch-delay-min-ms")]
    pub batch_delay_min_ms: u64,

    /// Upper bound of the randomized pause between batches, in milliseconds
    #[serde(rename = "batch-delay-max-ms")]
    pub batch_delay_max_ms: u64,

    /// Bounded wait for the next queued operation, in milliseconds
    ///
    /// When nothing arrives within this window the scheduler closes out the
    /// partial batch instead of waiting for a full one.
    #[serde(rename = "dequeue-timeout-ms")]
    pub dequeue_timeout_ms: u64,

    /// Per-request transport timeout, in milliseconds
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size_min: 3,
            batch_size_max: 5,
            batch_delay_min_ms: 5_000,
            batch_delay_max_ms: 10_000,
            dequeue_timeout_ms: 1_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size_min == 0 {
            return Err(eyre::eyre!("batch-size-min must be at least 1"));
        }
        if self.batch_size_min > self.batch_size_max {
            return Err(eyre::eyre!(
                "batch-size-min ({}) exceeds batch-size-max ({})",
                self.batch_size_min,
                self.batch_size_max
            ));
        }
        if self.batch_delay_min_ms > self.batch_delay_max_ms {
            return Err(eyre::eyre!(
                "batch-delay-min-ms ({}) exceeds batch-delay-max-ms ({})",
                self.batch_delay_min_ms,
                self.batch_delay_max_ms
            ));
        }
        if self.dequeue_timeout_ms == 0 {
            return Err(eyre::eyre!("dequeue-timeout-ms must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .requestpacer.yml
        let local_config = PathBuf::from(".requestpacer.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/requestpacer/requestpacer.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("requestpacer").join("requestpacer.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Bounded wait for the next queued operation
    pub(crate) fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    /// Per-request transport timeout
    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
