//! # Pitch Detection Module
//!
//! Autocorrelation pitch detection for monophonic, quasi-periodic signals such
//! as a plucked string or a sustained vocal tone.
//!
//! ## Algorithm
//! 1. Noise gate: windows whose RMS is below the silence threshold are rejected
//! 2. Autocorrelation `r(k) = Σ x[n]·x[n+k]` for every lag `k < N/2`
//! 3. Normalisation by the largest correlation value
//! 4. Interior local maxima are ranked against the strongest one; the first
//!    (shortest) lag reaching `peak_ratio` of it is the period, which keeps a
//!    quantised first peak from losing to its own double and reading an
//!    octave low
//! 5. `frequency = sample_rate / period`, with the period optionally refined
//!    to a fraction of a sample by parabolic interpolation
//!
//! Silence and the absence of a correlation peak are not errors. They are
//! reported as [`PitchEstimate::Undetected`].

use log::{debug, trace, warn};
use serde::Serialize;

use crate::config::{CorrelationMethod, DetectorConfig};
use crate::fft::FftCorrelator;

/// Default RMS level below which a window counts as silence.
pub const SILENCE_THRESHOLD: f64 = 0.05;

/// Fraction of the strongest correlation peak the chosen peak must reach.
pub const PEAK_RATIO: f64 = 0.7;

/// Shortest window the detector accepts. Anything shorter has no interior lag
/// to pick a peak from.
pub const MIN_WINDOW_LEN: usize = 4;

/// Outcome of analysing one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "frequency", rename_all = "snake_case")]
pub enum PitchEstimate {
    /// Fundamental frequency in Hz, always finite and positive.
    Detected(f64),
    /// Too quiet, or no periodicity found.
    Undetected,
}

impl PitchEstimate {
    /// The detected frequency in Hz, `None` when undetected.
    pub fn frequency(self) -> Option<f64> {
        match self {
            PitchEstimate::Detected(freq) => Some(freq),
            PitchEstimate::Undetected => None,
        }
    }

    /// `true` for [`PitchEstimate::Detected`].
    pub fn is_detected(self) -> bool {
        matches!(self, PitchEstimate::Detected(_))
    }
}

impl From<Option<f64>> for PitchEstimate {
    fn from(freq: Option<f64>) -> Self {
        match freq {
            Some(freq) if freq.is_finite() && freq > 0.0 => PitchEstimate::Detected(freq),
            _ => PitchEstimate::Undetected,
        }
    }
}

/// Estimates the fundamental frequency of `window` sampled at `sample_rate` Hz.
///
/// Uses the default configuration and allocates its own correlation series.
/// In a per-frame loop prefer [`AutocorrelationDetector`], which reuses its
/// scratch buffer.
pub fn detect(window: &[f32], sample_rate: u32) -> PitchEstimate {
    let mut series = Vec::with_capacity(window.len() / 2);
    detect_with(window, sample_rate, &DetectorConfig::default(), &mut series, |w, s| {
        autocorrelate(w, s)
    })
}

/// Reusable autocorrelation pitch detector.
///
/// Owns the correlation scratch buffer (and the FFT plan when
/// [`CorrelationMethod::Fft`] is configured) so repeated calls do not allocate
/// once the first window of a given length has been seen.
#[derive(Debug)]
pub struct AutocorrelationDetector {
    config: DetectorConfig,
    series: Vec<f64>,
    fft: Option<FftCorrelator>,
}

impl AutocorrelationDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            series: Vec::with_capacity(config.window_size / 2),
            config,
            fft: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyses one window. Same semantics as [`detect`].
    pub fn detect(&mut self, window: &[f32], sample_rate: u32) -> PitchEstimate {
        let config = &self.config;

        match config.method {
            CorrelationMethod::Direct => {
                detect_with(window, sample_rate, config, &mut self.series, |w, s| {
                    autocorrelate(w, s)
                })
            }
            CorrelationMethod::Fft => {
                if self.fft.as_ref().is_none_or(|fft| fft.window_len() != window.len()) {
                    debug!("[PITCH] Planning FFT correlator for {} samples", window.len());
                    self.fft = Some(FftCorrelator::new(window.len()));
                }
                let fft = self.fft.as_mut();
                detect_with(window, sample_rate, config, &mut self.series, |w, s| {
                    if let Some(fft) = fft {
                        fft.correlate(w, s);
                    }
                })
            }
        }
    }
}

impl Default for AutocorrelationDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

/// Shared detection pipeline; `correlate` fills the series for step 2.
fn detect_with<F>(
    window: &[f32],
    sample_rate: u32,
    config: &DetectorConfig,
    series: &mut Vec<f64>,
    correlate: F,
) -> PitchEstimate
where
    F: FnOnce(&[f32], &mut Vec<f64>),
{
    if !check_preconditions(window, sample_rate) {
        return PitchEstimate::Undetected;
    }

    // --- Noise Gate ---
    let level = rms(window);
    if level < config.silence_threshold {
        trace!("[PITCH] Below silence threshold (rms {level:.4})");
        return PitchEstimate::Undetected;
    }

    correlate(window, series);
    if !normalize(series) {
        return PitchEstimate::Undetected;
    }

    let Some(best_lag) = find_best_lag(series, config.peak_ratio) else {
        trace!("[PITCH] No correlation peak (rms {level:.4})");
        return PitchEstimate::Undetected;
    };

    let period = if config.interpolate {
        refine_lag(series, best_lag)
    } else {
        best_lag as f64
    };

    let estimate = PitchEstimate::from(Some(f64::from(sample_rate) / period));
    debug!("[PITCH] lag {best_lag} (period {period:.3}) -> {estimate:?}");
    estimate
}

fn check_preconditions(window: &[f32], sample_rate: u32) -> bool {
    let ok = window.len() >= MIN_WINDOW_LEN && sample_rate > 0;
    if !ok {
        warn!(
            "[PITCH] Invalid input: window of {} samples at {} Hz",
            window.len(),
            sample_rate
        );
    }
    debug_assert!(
        window.len() >= MIN_WINDOW_LEN,
        "window must hold at least {MIN_WINDOW_LEN} samples, got {}",
        window.len()
    );
    debug_assert!(sample_rate > 0, "sample rate must be positive");
    ok
}

/// Root-mean-square level of a window.
pub fn rms(window: &[f32]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let energy: f64 = window.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (energy / window.len() as f64).sqrt()
}

/// Direct O(N²/4) autocorrelation into `series`, resized to `N / 2` lags.
pub fn autocorrelate(window: &[f32], series: &mut Vec<f64>) {
    let n = window.len();
    series.clear();
    series.extend((0..n / 2).map(|lag| {
        window[..n - lag]
            .iter()
            .zip(&window[lag..])
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum::<f64>()
    }));
}

/// Divides every entry by the series maximum. Returns `false` when there is no
/// positive finite maximum to divide by.
fn normalize(series: &mut [f64]) -> bool {
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return false;
    }
    for value in series.iter_mut() {
        *value /= max;
    }
    true
}

/// Lag of the period peak: the first local maximum whose value reaches
/// `peak_ratio` times the strongest local maximum above zero.
///
/// Only lags `1..=len-2` are candidates, so both neighbours always exist and
/// neither lag 0 nor the last lag can be chosen. A ratio of 1.0 picks the
/// strongest peak itself.
pub fn find_best_lag(series: &[f64], peak_ratio: f64) -> Option<usize> {
    if series.len() < 3 {
        return None;
    }

    let peaks = || {
        series.windows(3).enumerate().filter_map(|(offset, w)| {
            let (prev, current, next) = (w[0], w[1], w[2]);
            (prev < current && next < current && current > 0.0).then_some((offset + 1, current))
        })
    };

    let best = peaks().map(|(_, value)| value).fold(0.0, f64::max);
    if best <= 0.0 {
        return None;
    }
    let threshold = best * peak_ratio.clamp(0.0, 1.0);
    peaks()
        .find(|&(_, value)| value >= threshold)
        .map(|(lag, _)| lag)
}

/// Parabolic interpolation around `lag` for a fractional period.
fn refine_lag(series: &[f64], lag: usize) -> f64 {
    let y1 = series[lag - 1];
    let y2 = series[lag];
    let y3 = series[lag + 1];

    let denominator = y1 - 2.0 * y2 + y3;
    if denominator.abs() < 1e-12 {
        return lag as f64;
    }
    let shift = 0.5 * (y1 - y3) / denominator;
    // A true local maximum keeps the vertex within half a sample.
    lag as f64 + shift.clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sine_wave;

    fn assert_close(estimate: PitchEstimate, expected: f64, tolerance: f64) {
        let freq = estimate
            .frequency()
            .unwrap_or_else(|| panic!("expected ~{expected} Hz, got {estimate:?}"));
        let error = ((freq - expected) / expected).abs();
        assert!(
            error < tolerance,
            "expected {expected} Hz, got {freq} Hz ({:.2}% error)",
            error * 100.0
        );
    }

    #[test]
    fn test_detect_a440() {
        let window = sine_wave(440.0, 44100, 2048, 0.8);
        assert_close(detect(&window, 44100), 440.0, 0.05);
    }

    #[test]
    fn test_detect_various_frequencies() {
        for &sample_rate in &[44100, 48000] {
            for &freq in &[82.41, 110.0, 196.0, 329.63, 880.0, 2000.0, 4000.0] {
                let window = sine_wave(freq, sample_rate, 2048, 0.5);
                assert_close(detect(&window, sample_rate), freq, 0.05);
            }
        }
    }

    #[test]
    fn test_silence_is_undetected() {
        let silence = vec![0.0; 2048];
        assert_eq!(detect(&silence, 44100), PitchEstimate::Undetected);

        let whisper = sine_wave(440.0, 44100, 2048, 0.01);
        assert_eq!(detect(&whisper, 44100), PitchEstimate::Undetected);
    }

    #[test]
    fn test_period_longer_than_half_window_is_undetected() {
        // 30 Hz needs a lag of 1470 samples; a 2048 window only searches 1022.
        let window = sine_wave(30.0, 44100, 2048, 0.8);
        assert_eq!(detect(&window, 44100), PitchEstimate::Undetected);
    }

    #[test]
    fn test_sine_sweep_up_to_quarter_sample_rate() {
        for method in [CorrelationMethod::Direct, CorrelationMethod::Fft] {
            let mut detector = AutocorrelationDetector::new(DetectorConfig {
                method,
                ..DetectorConfig::default()
            });
            for &sample_rate in &[44100, 48000] {
                let quarter_rate = f64::from(sample_rate) / 4.0;
                let mut freq = 100.0;
                while freq <= quarter_rate {
                    let window = sine_wave(freq, sample_rate, 2048, 0.8);
                    assert_close(detector.detect(&window, sample_rate), freq, 0.05);
                    freq *= 1.02;
                }
            }
        }
    }

    #[test]
    fn test_quantised_first_peak_is_not_read_an_octave_low() {
        // Period ~18.45 samples: lag 37 outscores lag 18, the true period.
        let window = sine_wave(2390.66, 44100, 2048, 0.8);
        let mut series = Vec::new();
        autocorrelate(&window, &mut series);
        assert!(normalize(&mut series));
        assert_eq!(find_best_lag(&series, 1.0), Some(37));
        assert_eq!(find_best_lag(&series, PEAK_RATIO), Some(18));

        assert_close(detect(&window, 44100), 2390.66, 0.05);
    }

    #[test]
    fn test_detected_frequency_is_positive() {
        let window = sine_wave(11025.0, 44100, 64, 1.0);
        let estimate = detect(&window, 44100);
        assert_close(estimate, 11025.0, 0.05);
        assert!(estimate.frequency().is_some_and(|f| f.is_finite() && f > 0.0));
    }

    #[test]
    fn test_smallest_windows_have_no_interior_lag() {
        // N = 4 and N = 5 both give a two-entry series: nothing between the edges.
        let four = [0.5, -0.5, 0.5, -0.5];
        let five = [0.5, -0.5, 0.5, -0.5, 0.5];
        assert_eq!(detect(&four, 44100), PitchEstimate::Undetected);
        assert_eq!(detect(&five, 44100), PitchEstimate::Undetected);

        let mut detector = AutocorrelationDetector::new(DetectorConfig {
            method: CorrelationMethod::Fft,
            ..DetectorConfig::default()
        });
        assert_eq!(detector.detect(&four, 44100), PitchEstimate::Undetected);
        assert_eq!(detector.detect(&five, 44100), PitchEstimate::Undetected);
    }

    #[test]
    fn test_integer_lag_without_interpolation() {
        let mut detector = AutocorrelationDetector::new(DetectorConfig {
            interpolate: false,
            ..DetectorConfig::default()
        });
        let window = sine_wave(440.0, 44100, 2048, 0.8);
        assert_eq!(detector.detect(&window, 44100), PitchEstimate::Detected(441.0));
    }

    #[test]
    fn test_interpolation_tightens_the_estimate() {
        let mut detector = AutocorrelationDetector::default();
        for &freq in &[110.0, 440.0, 1000.0] {
            let window = sine_wave(freq, 44100, 2048, 0.8);
            assert_close(detector.detect(&window, 44100), freq, 0.01);
        }
    }

    #[test]
    fn test_fft_method_matches_direct() {
        let window = sine_wave(261.63, 48000, 2048, 0.6);
        let mut direct = AutocorrelationDetector::default();
        let mut fft = AutocorrelationDetector::new(DetectorConfig {
            method: CorrelationMethod::Fft,
            ..DetectorConfig::default()
        });
        let a = direct.detect(&window, 48000).frequency().unwrap();
        let b = fft.detect(&window, 48000).frequency().unwrap();
        assert!((a - b).abs() < 1e-6, "direct {a} Hz vs fft {b} Hz");
    }

    #[test]
    fn test_detector_reuses_scratch_across_window_sizes() {
        let mut detector = AutocorrelationDetector::default();
        for &len in &[1024, 2048, 4096, 2048] {
            let window = sine_wave(440.0, 44100, len, 0.8);
            assert_close(detector.detect(&window, 44100), 440.0, 0.05);
        }
    }

    #[test]
    fn test_find_best_lag_ignores_edges() {
        // Rising to the last entry and falling from the first: no interior peak.
        assert_eq!(find_best_lag(&[1.0, 0.2, 0.4, 0.6, 0.9], PEAK_RATIO), None);
        assert_eq!(find_best_lag(&[1.0, 0.5], PEAK_RATIO), None);
    }

    #[test]
    fn test_find_best_lag_prefers_first_strong_peak() {
        let series = [1.0, 0.5, 0.8, 0.3, 0.9, 0.1];
        assert_eq!(find_best_lag(&series, PEAK_RATIO), Some(2));
        assert_eq!(find_best_lag(&series, 1.0), Some(4));
        // A weak early ripple does not qualify.
        assert_eq!(find_best_lag(&[1.0, 0.1, 0.2, 0.1, 0.9, 0.1], PEAK_RATIO), Some(4));
    }

    #[test]
    fn test_find_best_lag_needs_positive_peak() {
        assert_eq!(find_best_lag(&[1.0, -0.8, -0.2, -0.6, -0.1], PEAK_RATIO), None);
    }

    #[test]
    fn test_autocorrelate_lengths_and_values() {
        let mut series = Vec::new();
        autocorrelate(&[1.0, 2.0, 3.0, 4.0, 5.0], &mut series);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0], 55.0);
        assert_eq!(series[1], 40.0);
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_from_option() {
        assert_eq!(PitchEstimate::from(Some(440.0)), PitchEstimate::Detected(440.0));
        assert_eq!(PitchEstimate::from(Some(f64::INFINITY)), PitchEstimate::Undetected);
        assert_eq!(PitchEstimate::from(Some(0.0)), PitchEstimate::Undetected);
        assert_eq!(PitchEstimate::from(None), PitchEstimate::Undetected);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "window must hold")]
    fn test_short_window_panics_in_debug() {
        detect(&[0.5, -0.5], 44100);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "sample rate must be positive")]
    fn test_zero_sample_rate_panics_in_debug() {
        detect(&[0.5; 16], 0);
    }
}
