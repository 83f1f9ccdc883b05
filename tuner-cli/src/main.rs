//! # Tuner - terminal front-end
//!
//! Drives `tuner-core` from the command line:
//! - `note`   prints the musical reading of a frequency
//! - `tone`   synthesises a test tone and runs it through the detector
//! - `listen` analyses the default microphone in real time (feature `capture`)
//!
//! ## Architecture (listen)
//! - **Audio Thread**: CPAL callback assembling fixed-size windows
//! - **Worker Thread**: pitch detection on each window
//! - **Communication**: Crossbeam channels between the two and back to main

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};
use structopt::StructOpt;
use tuner_core::{
    audio::sine_wave, AnalysisResult, AutocorrelationDetector, DetectorConfig, Pitch,
};

#[derive(Debug, StructOpt)]
#[structopt(name = "tuner", about = "Real-time autocorrelation pitch detection")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// Detector settings as JSON (window_size, silence_threshold, method, peak_ratio, interpolate, smoothing).
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Print readings as JSON lines.
    #[structopt(long)]
    json: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Show note name, octave and cent deviation for a frequency.
    Note {
        /// Frequency in Hz.
        frequency: f64,
    },
    /// Detect the pitch of a synthesised sine window.
    Tone {
        /// Frequency in Hz.
        frequency: f64,
        #[structopt(short = "r", long, default_value = "44100")]
        sample_rate: u32,
        #[structopt(short, long, default_value = "0.8")]
        amplitude: f32,
    },
    /// Tune against the default input device.
    Listen {
        /// Stop after this many analysed windows.
        #[structopt(short, long)]
        frames: Option<usize>,
    },
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level).context("failed to initialise logging")?;

    let config = match &opt.config {
        Some(path) => DetectorConfig::load(path)
            .with_context(|| format!("could not use config {}", path.display()))?,
        None => DetectorConfig::default(),
    };
    debug!("[MAIN] Detector config: {:?}", config);

    match opt.command {
        Command::Note { frequency } => {
            check_frequency(frequency)?;
            print_pitch(&Pitch::new(frequency), opt.json)
        }
        Command::Tone {
            frequency,
            sample_rate,
            amplitude,
        } => {
            check_frequency(frequency)?;
            anyhow::ensure!(sample_rate > 0, "sample rate must be positive");
            anyhow::ensure!(
                amplitude.is_finite() && amplitude > 0.0,
                "amplitude must be a positive number"
            );
            let window = sine_wave(frequency, sample_rate, config.window_size, amplitude);
            let mut detector = AutocorrelationDetector::new(config);
            let result = AnalysisResult::from_estimate(detector.detect(&window, sample_rate));
            info!("[MAIN] {} Hz tone -> {:?}", frequency, result.estimate);
            print_result(&result, None, opt.json)
        }
        Command::Listen { frames } => listen::run(config, frames, opt.json),
    }
}

fn check_frequency(frequency: f64) -> Result<()> {
    anyhow::ensure!(
        frequency.is_finite() && frequency > 0.0,
        "frequency must be a positive number of Hz"
    );
    Ok(())
}

fn print_pitch(pitch: &Pitch, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(pitch)?);
    } else {
        println!("{}  {:+} cents", pitch, pitch.deviation_cents());
    }
    Ok(())
}

/// One output line per analysed window.
fn print_result(result: &AnalysisResult, smoothed: Option<f64>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(result)?);
        return Ok(());
    }
    match (&result.pitch, smoothed) {
        (Some(pitch), Some(cents)) => println!("{}  {:+.1} cents", pitch, cents),
        (Some(pitch), None) => println!("{}  {:+} cents", pitch, pitch.deviation_cents()),
        (None, _) => println!("-"),
    }
    Ok(())
}

#[cfg(feature = "capture")]
mod listen {
    use std::thread;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use cpal::traits::StreamTrait;
    use crossbeam_channel::{select, Receiver, Sender};
    use log::{error, info, warn};
    use tuner_core::{audio, AnalysisResult, DetectorConfig, PitchTracker};

    /// Reading sent from the worker: the frame result and the smoothed cents.
    type Reading = (AnalysisResult, Option<f64>);

    pub fn run(config: DetectorConfig, frames: Option<usize>, json: bool) -> Result<()> {
        let (reading_tx, reading_rx) = crossbeam_channel::unbounded::<Reading>();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let worker = thread::spawn(move || audio_worker(config, reading_tx, shutdown_rx));

        let mut seen = 0;
        for (result, smoothed) in reading_rx.iter() {
            super::print_result(&result, smoothed, json)?;
            seen += 1;
            if frames.is_some_and(|limit| seen >= limit) {
                break;
            }
        }

        let _ = shutdown_tx.send(());
        worker
            .join()
            .map_err(|_| anyhow!("audio worker panicked"))??;
        Ok(())
    }

    fn audio_worker(
        config: DetectorConfig,
        reading_tx: Sender<Reading>,
        shutdown_rx: Receiver<()>,
    ) -> Result<()> {
        info!("[AUDIO-THREAD] Starting audio capture...");
        let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(4);
        let (stream, sample_rate) = audio::start_audio_capture(raw_audio_tx, config.window_size)?;

        let mut tracker = PitchTracker::new(config);
        loop {
            select! {
                recv(raw_audio_rx) -> msg => match msg {
                    Ok(window) => {
                        let result = tracker.process(&window, sample_rate);
                        let smoothed = result.pitch.and(tracker.smoothed_cents());
                        if reading_tx.send((result, smoothed)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        warn!("[AUDIO-THREAD] Audio channel closed");
                        break;
                    }
                },
                recv(shutdown_rx) -> _ => {
                    info!("[AUDIO-THREAD] Received shutdown signal");
                    break;
                },
            }
        }

        if let Err(e) = stream.pause() {
            error!("[AUDIO-THREAD] Error pausing stream: {}", e);
        }
        thread::sleep(Duration::from_millis(50));
        drop(stream);
        info!("[AUDIO-THREAD] Audio thread finished");
        Ok(())
    }
}

#[cfg(not(feature = "capture"))]
mod listen {
    use anyhow::{bail, Result};
    use tuner_core::DetectorConfig;

    pub fn run(_config: DetectorConfig, _frames: Option<usize>, _json: bool) -> Result<()> {
        bail!("this build has no audio input; rebuild with `--features capture`")
    }
}
