// src/settings.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tracking::types::{AccuracyMode, MAX_TRACKING_FREQUENCY};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub default_tracking_frequency: u32,
    pub default_accuracy_mode: AccuracyMode,
    pub max_tracking_frequency: u32,
    pub background_tracking: bool,
    pub permission_timeout_seconds: u64,
    pub enable_logging: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_tracking_frequency: 30,
            default_accuracy_mode: AccuracyMode::Medium,
            max_tracking_frequency: MAX_TRACKING_FREQUENCY,
            background_tracking: false,
            permission_timeout_seconds: 120, // 2 minutes
            enable_logging: true,
        }
    }
}

impl TrackerConfig {
    pub fn permission_timeout(&self) -> Duration {
        Duration::from_secs(self.permission_timeout_seconds)
    }
}

fn get_settings_path() -> anyhow::Result<PathBuf> {
    let app_data = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(app_data.join("eye-tracking").join("tracker_settings.json"))
}

pub fn save_tracker_settings(config: &TrackerConfig) -> anyhow::Result<()> {
    save_tracker_settings_to(&get_settings_path()?, config)
}

pub fn load_tracker_settings() -> anyhow::Result<Option<TrackerConfig>> {
    load_tracker_settings_from(&get_settings_path()?)
}

pub fn save_tracker_settings_to(path: &Path, config: &TrackerConfig) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize tracker settings: {}", e))?;

    fs::write(path, json)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;

    log::info!("💾 Tracker settings saved to {}", path.display());
    Ok(())
}

pub fn load_tracker_settings_from(path: &Path) -> anyhow::Result<Option<TrackerConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;

    let config: TrackerConfig = serde_json::from_str(&json)
        .map_err(|e| anyhow::anyhow!("Failed to parse tracker settings: {}", e))?;

    log::info!("📂 Tracker settings loaded");
    Ok(Some(config))
}

/// Saved settings, falling back to defaults when none exist or they can't be read.
pub fn load_or_default() -> TrackerConfig {
    match load_tracker_settings() {
        Ok(Some(config)) => config,
        Ok(None) => TrackerConfig::default(),
        Err(e) => {
            log::warn!("Using default tracker settings: {}", e);
            TrackerConfig::default()
        }
    }
}
