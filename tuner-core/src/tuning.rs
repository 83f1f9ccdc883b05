//! # Musical Tuning Module
//!
//! Converts a detected frequency into musical terms using twelve-tone equal
//! temperament with A4 = 440 Hz = MIDI note 69.
//!
//! ## Features
//! - MIDI note number of the nearest equal-tempered pitch
//! - Note name and octave (scientific pitch notation, C4 = middle C)
//! - Deviation from the nearest note in cents
//! - Reference frequency of any MIDI note

use std::fmt;

use serde::Serialize;

use crate::pitch::PitchEstimate;

/// Concert pitch A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI_NOTE: i32 = 69;

/// One of the twelve pitch classes, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoteName {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C#")]
    CSharp,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D#")]
    DSharp,
    #[serde(rename = "E")]
    E,
    #[serde(rename = "F")]
    F,
    #[serde(rename = "F#")]
    FSharp,
    #[serde(rename = "G")]
    G,
    #[serde(rename = "G#")]
    GSharp,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A#")]
    ASharp,
    #[serde(rename = "B")]
    B,
}

/// Pitch classes indexed by `midi_note mod 12`, starting at C.
pub const NOTE_NAMES: [NoteName; 12] = [
    NoteName::C,
    NoteName::CSharp,
    NoteName::D,
    NoteName::DSharp,
    NoteName::E,
    NoteName::F,
    NoteName::FSharp,
    NoteName::G,
    NoteName::GSharp,
    NoteName::A,
    NoteName::ASharp,
    NoteName::B,
];

impl NoteName {
    /// The pitch class of a MIDI note number. Works for negative notes too.
    pub fn from_midi(note: i32) -> Self {
        NOTE_NAMES[note.rem_euclid(12) as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nearest MIDI note number for a frequency.
///
/// `round(12 * log2(freq / 440)) + 69`
pub fn midi_note_number(freq: f64) -> i32 {
    (12.0 * (freq / A4_FREQUENCY).log2()).round() as i32 + A4_MIDI_NOTE
}

/// Equal-tempered frequency of a MIDI note number.
///
/// `440 * 2^((note - 69) / 12)`
pub fn reference_frequency(note: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf(f64::from(note - A4_MIDI_NOTE) / 12.0)
}

/// Calculates the deviation from a target frequency in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
pub fn calculate_cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

/// Musical interpretation of one detected frequency.
///
/// Every field is derived once in [`Pitch::new`] and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "PitchReport")]
pub struct Pitch {
    frequency: f64,
    midi_note: i32,
}

impl Pitch {
    /// Builds the pitch for `frequency` Hz.
    ///
    /// The frequency must be finite and positive. [`Pitch::from_estimate`] is
    /// the checked path from detector output.
    pub fn new(frequency: f64) -> Self {
        debug_assert!(
            frequency.is_finite() && frequency > 0.0,
            "pitch frequency must be finite and positive, got {frequency}"
        );
        Self {
            frequency,
            midi_note: midi_note_number(frequency),
        }
    }

    /// `Some(Pitch)` for a detected estimate, `None` otherwise.
    pub fn from_estimate(estimate: PitchEstimate) -> Option<Self> {
        estimate.frequency().map(Self::new)
    }

    /// The frequency rounded to two decimal places.
    pub fn frequency(&self) -> f64 {
        ((self.frequency + f64::EPSILON) * 100.0).round() / 100.0
    }

    /// The frequency exactly as measured.
    pub fn raw_frequency(&self) -> f64 {
        self.frequency
    }

    pub fn midi_note_number(&self) -> i32 {
        self.midi_note
    }

    pub fn note_name(&self) -> NoteName {
        NoteName::from_midi(self.midi_note)
    }

    pub fn octave(&self) -> i32 {
        self.midi_note.div_euclid(12) - 1
    }

    /// Equal-tempered frequency of the nearest note.
    pub fn reference_frequency(&self) -> f64 {
        reference_frequency(self.midi_note)
    }

    /// Signed distance from the nearest note in whole cents, floored.
    pub fn deviation_cents(&self) -> i32 {
        calculate_cents_deviation(self.frequency, self.reference_frequency()).floor() as i32
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} Hz)",
            self.note_name(),
            self.octave(),
            self.frequency()
        )
    }
}

/// Serialized shape of a [`Pitch`]: the derived fields a display needs.
#[derive(Debug, Clone, Serialize)]
struct PitchReport {
    frequency: f64,
    midi_note: i32,
    note_name: NoteName,
    octave: i32,
    deviation_cents: i32,
}

impl From<Pitch> for PitchReport {
    fn from(pitch: Pitch) -> Self {
        Self {
            frequency: pitch.frequency(),
            midi_note: pitch.midi_note_number(),
            note_name: pitch.note_name(),
            octave: pitch.octave(),
            deviation_cents: pitch.deviation_cents(),
        }
    }
}
