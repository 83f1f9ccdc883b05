//! # Detector Configuration
//!
//! Tunable parameters for the detector and tracker, loadable from and savable
//! to JSON. Missing fields take their defaults, so an empty object `{}` is a
//! valid config.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::audio::BUFFER_SIZE;
use crate::error::{ConfigError, Result};
use crate::pitch::{MIN_WINDOW_LEN, PEAK_RATIO, SILENCE_THRESHOLD};

/// How the correlation series is computed. Both produce the same series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Pairwise sums, O(N²/4).
    #[default]
    Direct,
    /// Wiener-Khinchin via RustFFT, O(N log N).
    Fft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Samples per analysis window.
    pub window_size: usize,
    /// RMS below which a window is treated as silence.
    pub silence_threshold: f64,
    pub method: CorrelationMethod,
    /// Share of the strongest correlation peak the period peak must reach.
    pub peak_ratio: f64,
    /// Refine the peak lag with parabolic interpolation. Without it the
    /// period is a whole number of samples.
    pub interpolate: bool,
    /// Number of recent cent readings averaged by the tracker.
    pub smoothing: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: BUFFER_SIZE,
            silence_threshold: SILENCE_THRESHOLD,
            method: CorrelationMethod::Direct,
            peak_ratio: PEAK_RATIO,
            interpolate: true,
            smoothing: 5,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < MIN_WINDOW_LEN {
            return Err(ConfigError::WindowTooShort {
                got: self.window_size,
                min: MIN_WINDOW_LEN,
            });
        }
        if !(self.silence_threshold.is_finite() && self.silence_threshold >= 0.0) {
            return Err(ConfigError::InvalidSilenceThreshold(self.silence_threshold));
        }
        if !(self.peak_ratio > 0.0 && self.peak_ratio <= 1.0) {
            return Err(ConfigError::InvalidPeakRatio(self.peak_ratio));
        }
        if self.smoothing == 0 {
            return Err(ConfigError::ZeroSmoothing);
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: DetectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&data)?;
        info!("[CONFIG] Loaded detector config from {}", path.display());
        Ok(config)
    }

    /// Saves the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
