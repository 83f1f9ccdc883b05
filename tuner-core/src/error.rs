//! Error types for the tuner core.
//!
//! Detection itself never fails: an unusable window is reported as
//! [`PitchEstimate::Undetected`](crate::pitch::PitchEstimate). Errors only come
//! from loading or validating a [`DetectorConfig`](crate::config::DetectorConfig).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed detector config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("window size must be at least {min} samples, got {got}")]
    WindowTooShort { got: usize, min: usize },

    #[error("silence threshold must be finite and non-negative, got {0}")]
    InvalidSilenceThreshold(f64),

    #[error("peak ratio must be in (0, 1], got {0}")]
    InvalidPeakRatio(f64),

    #[error("smoothing needs at least one frame")]
    ZeroSmoothing,
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
