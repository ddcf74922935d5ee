use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::*;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Whether an active liveness protocol runs before capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessLevel {
    #[default]
    Off,
    BlinkChallenge,
}

/// Tunable thresholds for every gate in the capture pipeline.
///
/// Every field falls back to its default when missing from a config file,
/// so partial overrides are valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureThresholds {
    pub movement_threshold: f64,
    pub stability_threshold: u32,
    pub center_threshold_x: f64,
    pub center_threshold_y: f64,
    pub min_centered_frames: u32,
    pub blink_threshold: f64,
    pub required_blinks: u32,
    pub required_consecutive_live_frames: u32,
    pub sharpness_floor: f64,
    pub min_interval_ms: u64,
    pub max_processing_ms: u64,
    pub batch_update_interval: u64,
}

impl Default for CaptureThresholds {
    fn default() -> Self {
        Self {
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            center_threshold_x: DEFAULT_CENTER_THRESHOLD_X,
            center_threshold_y: DEFAULT_CENTER_THRESHOLD_Y,
            min_centered_frames: DEFAULT_MIN_CENTERED_FRAMES,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            required_blinks: DEFAULT_REQUIRED_BLINKS,
            required_consecutive_live_frames: DEFAULT_REQUIRED_CONSECUTIVE_LIVE_FRAMES,
            sharpness_floor: DEFAULT_SHARPNESS_FLOOR,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            max_processing_ms: DEFAULT_MAX_PROCESSING_MS,
            batch_update_interval: DEFAULT_BATCH_UPDATE_INTERVAL,
        }
    }
}

impl CaptureThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.movement_threshold.is_finite() && self.movement_threshold > 0.0,
            "movement_threshold",
            "must be a positive number",
        )?;
        ensure(self.stability_threshold >= 1, "stability_threshold", "must be at least 1")?;
        ensure(
            is_fraction(self.center_threshold_x),
            "center_threshold_x",
            "must be in (0, 0.5]",
        )?;
        ensure(
            is_fraction(self.center_threshold_y),
            "center_threshold_y",
            "must be in (0, 0.5]",
        )?;
        ensure(self.min_centered_frames >= 1, "min_centered_frames", "must be at least 1")?;
        ensure(
            self.blink_threshold > 0.0 && self.blink_threshold < 1.0,
            "blink_threshold",
            "must be in (0, 1)",
        )?;
        ensure(self.required_blinks >= 1, "required_blinks", "must be at least 1")?;
        ensure(
            self.required_consecutive_live_frames >= 1,
            "required_consecutive_live_frames",
            "must be at least 1",
        )?;
        ensure(
            self.sharpness_floor.is_finite() && self.sharpness_floor >= 0.0,
            "sharpness_floor",
            "must be a non-negative number",
        )?;
        ensure(
            self.batch_update_interval >= 1,
            "batch_update_interval",
            "must be at least 1",
        )
    }
}

/// Everything fixed at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub liveness_level: LivenessLevel,
    /// Bar both the model confidence and the combined score must clear.
    pub spoof_acceptance_level: f64,
    pub thresholds: CaptureThresholds,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness_level: LivenessLevel::Off,
            spoof_acceptance_level: DEFAULT_SPOOF_ACCEPTANCE_LEVEL,
            thresholds: CaptureThresholds::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_liveness_level(mut self, level: LivenessLevel) -> Self {
        self.liveness_level = level;
        self
    }

    pub fn with_spoof_acceptance_level(mut self, level: f64) -> Self {
        self.spoof_acceptance_level = level;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.spoof_acceptance_level >= 0.0 && self.spoof_acceptance_level < 1.0,
            "spoof_acceptance_level",
            "must be in [0, 1)",
        )?;
        self.thresholds.validate()
    }

    /// Reads and validates a JSON session config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Platform config location, e.g. `~/.config/FaceGate/session.json`.
    pub fn default_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }
}

fn is_fraction(value: f64) -> bool {
    value > 0.0 && value <= 0.5
}

fn ensure(cond: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    if cond {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason })
    }
}
