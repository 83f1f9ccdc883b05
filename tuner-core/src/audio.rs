//! # Audio Capture Module
//!
//! Turns a raw sample stream into the fixed-size windows the detector
//! analyses, and (with the `capture` feature) streams them from the default
//! input device using CPAL (Cross-Platform Audio Library).
//!
//! ## Features
//! - Window assembly from arbitrarily sized callback buffers
//! - Sine test tones for self-checks and benchmarks
//! - Automatic input device selection (feature `capture`)

/// Audio buffer size for processing frames.
///
/// The recommended analysis window: at 44.1 kHz it spans ~46 ms and resolves
/// fundamentals down to ~43 Hz (the longest searched lag is half a window).
pub const BUFFER_SIZE: usize = 2048;

/// Collects incoming samples and hands out complete windows in arrival order.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    window_len: usize,
    pending: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(window_len: usize) -> Self {
        assert!(window_len > 0, "window length must be positive");
        Self {
            window_len,
            pending: Vec::with_capacity(window_len * 2),
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Samples waiting for the next complete window.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Appends `data` and returns every window that is now complete.
    pub fn push(&mut self, data: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(data);

        let mut frames = Vec::with_capacity(self.pending.len() / self.window_len);
        let mut start = 0;
        while self.pending.len() - start >= self.window_len {
            frames.push(self.pending[start..start + self.window_len].to_vec());
            start += self.window_len;
        }
        self.pending.drain(..start);
        frames
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// `len` samples of a sine at `freq` Hz with peak `amplitude`.
pub fn sine_wave(freq: f64, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    let step = 2.0 * std::f64::consts::PI * freq / f64::from(sample_rate);
    (0..len)
        .map(|i| amplitude * (step * i as f64).sin() as f32)
        .collect()
}

#[cfg(feature = "capture")]
pub use self::capture::start_audio_capture;

#[cfg(feature = "capture")]
mod capture {
    use anyhow::{anyhow, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::SupportedStreamConfigRange;
    use crossbeam_channel::Sender;
    use log::{error, info, trace};

    use super::FrameAssembler;

    const TARGET_SAMPLE_RATE: u32 = 44100;

    /// Starts audio capture from the default input device.
    ///
    /// Every complete window of `window_len` samples is sent on `sender`;
    /// windows are dropped when the receiver falls behind.
    ///
    /// # Returns
    /// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
    /// * `Err(e)` - Error if audio setup fails
    pub fn start_audio_capture(
        sender: Sender<Vec<f32>>,
        window_len: usize,
    ) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;

        info!("[AUDIO] Using audio input device: {}", device.name()?);

        let configs = device.supported_input_configs()?.collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
            .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

        let rate = TARGET_SAMPLE_RATE.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
        let sample_rate = config.sample_rate().0;
        let config: cpal::StreamConfig = config.into();

        info!("[AUDIO] Selected sample rate: {} Hz", sample_rate);

        let err_fn = |err| error!("[AUDIO] An error occurred on the audio stream: {}", err);
        let mut assembler = FrameAssembler::new(window_len);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in assembler.push(data) {
                    if sender.try_send(frame).is_err() {
                        trace!("[AUDIO] Analysis busy, dropping window");
                    }
                }
            },
            err_fn,
            None,
        )?;

        stream.play()?;

        Ok((stream, sample_rate))
    }

    /// Mono f32 configuration whose rate range is closest to `target_rate`.
    fn find_supported_config(
        configs: Vec<SupportedStreamConfigRange>,
        target_rate: u32,
    ) -> Option<SupportedStreamConfigRange> {
        configs
            .into_iter()
            .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
            .min_by_key(|c| {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                    0
                } else {
                    min_diff.min(max_diff)
                }
            })
    }
}
