use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do when the pin resource cannot be loaded
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackupPolicy {
    /// The fetched resource is the only source; failures mean no pins
    #[default]
    AuthoritativeOnly,
    /// Restore the last local backup when the fetch fails
    FallbackToBackup,
}

/// Rotation tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RotationConfig {
    pub enabled: bool,
    pub top_slots: usize,
    pub interval_secs: u64,
    /// Delay before rotating after the page becomes visible again
    pub visibility_delay_ms: u64,
    /// Delay standing in for "after the next paint"
    pub frame_delay_ms: u64,
    pub highlight_step_ms: u64,
    pub highlight_duration_ms: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_slots: 3,
            interval_secs: 30 * 60,
            visibility_delay_ms: 500,
            frame_delay_ms: 100,
            highlight_step_ms: 100,
            highlight_duration_ms: 2000,
        }
    }
}

impl RotationConfig {
    /// Never zero, the scheduler's ticker needs a positive period
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn visibility_delay(&self) -> Duration {
        Duration::from_millis(self.visibility_delay_ms)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn highlight_step(&self) -> Duration {
        Duration::from_millis(self.highlight_step_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }
}

/// Site configuration, read from an optional JSON file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listing page to order
    pub page: PathBuf,
    /// Pin resource: file path or http(s) URL
    pub pins_resource: String,
    /// Directory used as local durable storage
    pub storage_dir: PathBuf,
    pub backup_policy: BackupPolicy,
    pub max_pinned_cards: u32,
    pub rotation: RotationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page: PathBuf::from("index.html"),
            pins_resource: "js/pinned-cards.json".to_string(),
            storage_dir: PathBuf::from(".pg-finder"),
            backup_policy: BackupPolicy::default(),
            max_pinned_cards: 10,
            rotation: RotationConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        if config.rotation.interval_secs == 0 {
            return Err(Error::MalformedData(
                "rotation.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load from `path`, or defaults when no path is given
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }
}
