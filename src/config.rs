//! Configuration Management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pointer::classifier::GestureThresholds;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Disable all recording. A disabled engine drops every signal.
    pub disable: bool,
    /// Upload settings
    pub upload: UploadConfig,
    /// Gesture classification thresholds
    pub gestures: GestureThresholds,
    /// Structural capture settings
    pub capture: CaptureConfig,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Ingest endpoint receiving chunk POSTs. Required unless disabled.
    pub endpoint: String,
    /// Periodic flush interval (ms)
    pub interval_ms: u64,
    /// Input silence after which uploads pause (ms)
    pub inactivity_timeout_ms: u64,
    /// Minimum spacing between inactivity-timer resets (ms)
    pub activity_throttle_ms: u64,
    /// Per-request HTTP timeout (ms)
    pub request_timeout_ms: u64,
}

/// Structural capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Debounce between a tree-mutation signal and the capture (ms)
    pub debounce_ms: u64,
    /// Signature-cache entry bound
    pub cache_capacity: usize,
    /// Node-type labels excluded from capture (host internals, decorations)
    pub excluded_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            interval_ms: 10_000,
            inactivity_timeout_ms: 30_000,
            activity_throttle_ms: 200,
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 75,
            cache_capacity: 128,
            excluded_types: Vec::new(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !self.disable && self.upload.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.upload.interval_ms == 0 {
            return Err(Error::InvalidConfiguration(
                "interval_ms must be > 0".to_string(),
            ));
        }
        if self.upload.inactivity_timeout_ms <= self.upload.activity_throttle_ms {
            return Err(Error::InvalidConfiguration(format!(
                "inactivity_timeout_ms must exceed activity_throttle_ms, got {} <= {}",
                self.upload.inactivity_timeout_ms, self.upload.activity_throttle_ms
            )));
        }
        if self.gestures.movement_slop_px <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "movement_slop_px must be > 0, got {}",
                self.gestures.movement_slop_px
            )));
        }
        if self.gestures.long_press_ms == 0 || self.gestures.double_tap_window_ms == 0 {
            return Err(Error::InvalidConfiguration(
                "gesture timer durations must be > 0".to_string(),
            ));
        }
        if self.capture.debounce_ms == 0 {
            return Err(Error::InvalidConfiguration(
                "debounce_ms must be > 0".to_string(),
            ));
        }
        if self.capture.cache_capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "cache_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfiguration(e.to_string()))?;

        // Create parent directories
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".uxtrace").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }
}
