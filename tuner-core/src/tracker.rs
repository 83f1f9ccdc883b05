//! Frame-to-frame tuner state.
//!
//! A display refreshes once per window. When a window yields no pitch the
//! display keeps showing the last note rather than blanking, and the needle
//! follows a short moving average of the cent deviation.

use std::collections::VecDeque;

use log::debug;

use crate::config::DetectorConfig;
use crate::pitch::AutocorrelationDetector;
use crate::tuning::Pitch;
use crate::AnalysisResult;

#[derive(Debug)]
pub struct PitchTracker {
    detector: AutocorrelationDetector,
    current: Option<Pitch>,
    smoothing: usize,
    cents_history: VecDeque<i32>,
}

impl PitchTracker {
    pub fn new(config: DetectorConfig) -> Self {
        let smoothing = config.smoothing.max(1);
        Self {
            detector: AutocorrelationDetector::new(config),
            current: None,
            smoothing,
            cents_history: VecDeque::with_capacity(smoothing),
        }
    }

    /// Analyses one window and updates the held reading if a pitch was found.
    pub fn process(&mut self, window: &[f32], sample_rate: u32) -> AnalysisResult {
        let result = AnalysisResult::from_estimate(self.detector.detect(window, sample_rate));

        if let Some(pitch) = result.pitch {
            // A new note restarts the average so the needle doesn't drag.
            let changed = self
                .current
                .is_some_and(|held| held.midi_note_number() != pitch.midi_note_number());
            if changed {
                debug!("[TRACKER] Note changed to {}", pitch);
                self.cents_history.clear();
            }

            self.cents_history.push_back(pitch.deviation_cents());
            if self.cents_history.len() > self.smoothing {
                self.cents_history.pop_front();
            }
            self.current = Some(pitch);
        }

        result
    }

    /// Last detected pitch; unchanged by undetected frames.
    pub fn current(&self) -> Option<&Pitch> {
        self.current.as_ref()
    }

    /// Mean deviation over the last `smoothing` detections of the current note.
    pub fn smoothed_cents(&self) -> Option<f64> {
        if self.cents_history.is_empty() {
            return None;
        }
        let sum: i32 = self.cents_history.iter().sum();
        Some(f64::from(sum) / self.cents_history.len() as f64)
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.cents_history.clear();
    }

    pub fn config(&self) -> &DetectorConfig {
        self.detector.config()
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
