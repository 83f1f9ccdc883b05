// tuner-core/src/lib.rs

//! The core logic for the tuner.
//! This crate is responsible for pitch detection and for turning a detected
//! frequency into a note name, octave and cent deviation. It is completely
//! headless and contains no UI code.
//!
//! ```
//! use tuner_core::{audio::sine_wave, pitch, tuning::{NoteName, Pitch}};
//!
//! let window = sine_wave(440.0, 44100, 2048, 0.8);
//! let estimate = pitch::detect(&window, 44100);
//! let pitch = Pitch::from_estimate(estimate).unwrap();
//! assert_eq!(pitch.note_name(), NoteName::A);
//! assert_eq!(pitch.octave(), 4);
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod pitch;
pub mod tracker;
pub mod tuning;

use serde::Serialize;

pub use config::{CorrelationMethod, DetectorConfig};
pub use error::ConfigError;
pub use pitch::{detect, AutocorrelationDetector, PitchEstimate};
pub use tracker::PitchTracker;
pub use tuning::{NoteName, Pitch};

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Raw detector output.
    pub estimate: PitchEstimate,
    /// The musical reading, present exactly when the estimate is detected.
    pub pitch: Option<Pitch>,
}

impl AnalysisResult {
    pub fn from_estimate(estimate: PitchEstimate) -> Self {
        Self {
            estimate,
            pitch: Pitch::from_estimate(estimate),
        }
    }
}
