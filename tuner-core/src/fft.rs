//! # Fast Fourier Transform (FFT) Module
//!
//! FFT-based autocorrelation for large analysis windows. By the
//! Wiener-Khinchin theorem the autocorrelation of `x` is the inverse transform
//! of its power spectrum, `r = IFFT(|FFT(x)|²)`. Zero padding to at least `2N`
//! turns the circular correlation into the linear one the detector needs, so
//! the series equals [`autocorrelate`](crate::pitch::autocorrelate) up to
//! rounding, in O(N log N) instead of O(N²).

use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Planned forward/inverse transforms plus the work buffers for one window
/// length.
pub struct FftCorrelator {
    window_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl FftCorrelator {
    pub fn new(window_len: usize) -> Self {
        let fft_len = (2 * window_len).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            window_len,
            forward,
            inverse,
            buffer: vec![Complex::default(); fft_len],
            scratch: vec![Complex::default(); scratch_len],
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Writes the autocorrelation of `window` for lags `0..N/2` into `series`.
    ///
    /// # Panics
    /// * If `window` is not the length this correlator was planned for
    pub fn correlate(&mut self, window: &[f32], series: &mut Vec<f64>) {
        assert_eq!(
            window.len(),
            self.window_len,
            "FftCorrelator planned for {} samples",
            self.window_len
        );

        let fft_len = self.buffer.len();
        for (slot, &sample) in self.buffer.iter_mut().zip(window) {
            *slot = Complex::new(f64::from(sample), 0.0);
        }
        for slot in &mut self.buffer[window.len()..] {
            *slot = Complex::default();
        }

        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        for bin in self.buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // RustFFT does not normalise; the round trip scales by fft_len.
        let scale = fft_len as f64;
        series.clear();
        series.extend(
            self.buffer[..self.window_len / 2]
                .iter()
                .map(|c| c.re / scale),
        );
    }
}

impl fmt::Debug for FftCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftCorrelator")
            .field("window_len", &self.window_len)
            .field("fft_len", &self.buffer.len())
            .finish()
    }
}
