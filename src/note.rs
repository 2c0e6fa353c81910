// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Notes, pitch classes and the equal-temperament frequency table.

use std::{fmt, str::FromStr};

use tracing::warn;

use crate::error::ToneError;

/// Frequency returned whenever a note can't be resolved.
pub const DEFAULT_FREQUENCY_HZ: f64 = 440.0;

/// The octave the frequency table is expressed in.
pub const REFERENCE_OCTAVE: i32 = 4;

/// Lowest frequency the engine will emit.
pub const MIN_FREQUENCY_HZ: f64 = 8.0;

/// Highest frequency the engine will emit.
pub const MAX_FREQUENCY_HZ: f64 = 20_000.0;

/// One of the twelve note names within an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in ascending order starting at C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        self as i32
    }

    /// Gets the pitch class for the given number of semitones above C, wrapping
    /// around the octave.
    pub fn from_semitone(semitone: i32) -> PitchClass {
        PitchClass::ALL[semitone.rem_euclid(12) as usize]
    }

    /// The canonical name, e.g. "C#".
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Reference frequency at octave 4 (A4 = 440 Hz).
    pub fn reference_frequency(self) -> f64 {
        match self {
            PitchClass::C => 261.63,
            PitchClass::CSharp => 277.18,
            PitchClass::D => 293.66,
            PitchClass::DSharp => 311.13,
            PitchClass::E => 329.63,
            PitchClass::F => 349.23,
            PitchClass::FSharp => 369.99,
            PitchClass::G => 392.00,
            PitchClass::GSharp => 415.30,
            PitchClass::A => 440.00,
            PitchClass::ASharp => 466.16,
            PitchClass::B => 493.88,
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = ToneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PitchClass::ALL
            .into_iter()
            .find(|pitch| pitch.name() == s)
            .ok_or_else(|| ToneError::UnknownNote(s.to_string()))
    }
}

/// A pitch class in a specific octave, e.g. C#4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note {
    /// Note octave comes first so that notes sort by pitch.
    octave: i32,
    pitch: PitchClass,
}

impl Note {
    /// Creates a new note.
    pub fn new(pitch: PitchClass, octave: i32) -> Note {
        Note { octave, pitch }
    }

    /// The note's pitch class.
    pub fn pitch(&self) -> PitchClass {
        self.pitch
    }

    /// The note's octave.
    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Returns the note the given number of semitones above (or below) this one.
    /// The octave saturates at the bounds of `i32`.
    pub fn transpose(&self, semitones: i32) -> Note {
        let absolute = i64::from(self.octave) * 12
            + i64::from(self.pitch.semitone())
            + i64::from(semitones);
        let octave = absolute
            .div_euclid(12)
            .clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        Note {
            octave: octave as i32,
            pitch: PitchClass::from_semitone(absolute.rem_euclid(12) as i32),
        }
    }

    /// Raw frequency: `table[pitch] * 2^(octave - 4)`. Not range checked, and
    /// extreme octaves come out as 0 or infinity.
    pub fn raw_frequency(&self) -> f64 {
        self.pitch.reference_frequency()
            * 2f64.powi(self.octave.saturating_sub(REFERENCE_OCTAVE))
    }

    /// The note's frequency, validated to be finite and within the audible range.
    pub fn frequency(&self) -> Result<f64, ToneError> {
        validate_frequency(&self.to_string(), self.raw_frequency())
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

impl FromStr for Note {
    type Err = ToneError;

    /// Parses the canonical form: letter, optional '#', signed octave.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ToneError::UnknownNote(s.to_string());
        let trimmed = s.trim();
        if !trimmed.is_ascii() {
            return Err(unknown());
        }
        let split = match trimmed.as_bytes().get(1) {
            Some(b'#') => 2,
            Some(_) => 1,
            None => return Err(unknown()),
        };
        let (pitch, octave) = trimmed.split_at(split);
        let pitch = pitch.parse::<PitchClass>().map_err(|_| unknown())?;
        let octave = octave.parse::<i32>().map_err(|_| unknown())?;
        Ok(Note::new(pitch, octave))
    }
}

/// The result of a frequency lookup. When the lookup failed, `hz` holds the
/// fallback frequency and `warning` says why.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub hz: f64,
    pub warning: Option<ToneError>,
}

impl Lookup {
    fn resolved(hz: f64) -> Lookup {
        Lookup { hz, warning: None }
    }

    fn fallback(warning: ToneError) -> Lookup {
        warn!(
            warning = %warning,
            fallback_hz = DEFAULT_FREQUENCY_HZ,
            "Using fallback frequency"
        );
        Lookup {
            hz: DEFAULT_FREQUENCY_HZ,
            warning: Some(warning),
        }
    }

    /// Returns true if the fallback frequency was used.
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some()
    }
}

/// Looks up the frequency of a pitch class name at an octave. Unknown names and
/// out-of-range results fall back to 440 Hz with a warning.
pub fn frequency_of(pitch: &str, octave: i32) -> Lookup {
    match pitch.trim().parse::<PitchClass>() {
        Ok(pitch) => match Note::new(pitch, octave).frequency() {
            Ok(hz) => Lookup::resolved(hz),
            Err(e) => Lookup::fallback(e),
        },
        Err(_) => Lookup::fallback(ToneError::UnknownNote(format!("{}{}", pitch.trim(), octave))),
    }
}

/// Looks up the frequency of a full note identifier such as "C#4".
pub fn frequency_of_id(id: &str) -> Lookup {
    match id.parse::<Note>() {
        Ok(note) => match note.frequency() {
            Ok(hz) => Lookup::resolved(hz),
            Err(e) => Lookup::fallback(e),
        },
        Err(e) => Lookup::fallback(e),
    }
}

/// Checks that a computed frequency is finite, positive and audible.
pub fn validate_frequency(note: &str, hz: f64) -> Result<f64, ToneError> {
    if hz.is_finite() && (MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&hz) {
        Ok(hz)
    } else {
        Err(ToneError::InvalidFrequency {
            note: note.to_string(),
            hz,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_reference_octave_matches_table() {
        let expected = [
            ("C", 261.63),
            ("C#", 277.18),
            ("D", 293.66),
            ("D#", 311.13),
            ("E", 329.63),
            ("F", 349.23),
            ("F#", 369.99),
            ("G", 392.00),
            ("G#", 415.30),
            ("A", 440.00),
            ("A#", 466.16),
            ("B", 493.88),
        ];
        for (name, hz) in expected {
            let lookup = frequency_of(name, 4);
            assert_eq!(lookup.hz, hz, "{}", name);
            assert!(!lookup.is_fallback());
        }
    }

    #[test]
    fn test_octave_scaling() {
        for pitch in PitchClass::ALL {
            let base = frequency_of(pitch.name(), 4).hz;
            for octave in 0..=9 {
                let lookup = frequency_of(pitch.name(), octave);
                let expected = base * 2f64.powi(octave - 4);
                if expected <= MAX_FREQUENCY_HZ {
                    assert!(
                        (lookup.hz - expected).abs() < TOLERANCE * expected,
                        "{}{}",
                        pitch,
                        octave
                    );
                }
            }
        }
    }

    #[test]
    fn test_unknown_note_falls_back() {
        let lookup = frequency_of("H", 4);
        assert_eq!(lookup.hz, DEFAULT_FREQUENCY_HZ);
        assert_eq!(lookup.warning, Some(ToneError::UnknownNote("H4".into())));

        let lookup = frequency_of_id("H4");
        assert_eq!(lookup.hz, 440.0);
        assert!(matches!(lookup.warning, Some(ToneError::UnknownNote(_))));
    }

    #[test]
    fn test_out_of_range_falls_back() {
        let lookup = frequency_of("B", 11);
        assert_eq!(lookup.hz, DEFAULT_FREQUENCY_HZ);
        assert!(matches!(
            lookup.warning,
            Some(ToneError::InvalidFrequency { .. })
        ));

        let lookup = frequency_of("C", -3);
        assert!(lookup.is_fallback());
    }

    #[test]
    fn test_extreme_octaves_fall_back() {
        for octave in [i32::MIN, i32::MIN + 3, i32::MAX] {
            let lookup = frequency_of("C", octave);
            assert_eq!(lookup.hz, DEFAULT_FREQUENCY_HZ, "{}", octave);
            assert!(matches!(
                lookup.warning,
                Some(ToneError::InvalidFrequency { .. })
            ));
        }

        assert!(frequency_of_id("C-2147483648").is_fallback());
        assert!(frequency_of_id("B2147483647").is_fallback());
        assert!(Note::new(PitchClass::A, i32::MIN).raw_frequency() < MIN_FREQUENCY_HZ);
        assert!(Note::new(PitchClass::A, i32::MAX).raw_frequency() > MAX_FREQUENCY_HZ);
    }

    #[test]
    fn test_validate_frequency() {
        assert!(validate_frequency("x", f64::NAN).is_err());
        assert!(validate_frequency("x", f64::INFINITY).is_err());
        assert!(validate_frequency("x", 0.0).is_err());
        assert!(validate_frequency("x", -440.0).is_err());
        assert_eq!(validate_frequency("x", 440.0), Ok(440.0));
    }

    #[test]
    fn test_parse_note() {
        assert_eq!(
            "C#4".parse::<Note>(),
            Ok(Note::new(PitchClass::CSharp, 4))
        );
        assert_eq!("A0".parse::<Note>(), Ok(Note::new(PitchClass::A, 0)));
        assert_eq!("C-1".parse::<Note>(), Ok(Note::new(PitchClass::C, -1)));
        assert!("H4".parse::<Note>().is_err());
        assert!("C".parse::<Note>().is_err());
        assert!("C#".parse::<Note>().is_err());
        assert!("".parse::<Note>().is_err());
        assert!("Db4".parse::<Note>().is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        for pitch in PitchClass::ALL {
            let note = Note::new(pitch, 3);
            assert_eq!(note.to_string().parse::<Note>(), Ok(note));
        }
        assert_eq!(Note::new(PitchClass::FSharp, 5).to_string(), "F#5");
    }

    #[test]
    fn test_transpose() {
        let c4 = Note::new(PitchClass::C, 4);
        assert_eq!(c4.transpose(4), Note::new(PitchClass::E, 4));
        assert_eq!(c4.transpose(12), Note::new(PitchClass::C, 5));
        assert_eq!(c4.transpose(-1), Note::new(PitchClass::B, 3));
        let a4 = Note::new(PitchClass::A, 4);
        assert_eq!(a4.transpose(4), Note::new(PitchClass::CSharp, 5));
    }

    #[test]
    fn test_transpose_saturates() {
        let top = Note::new(PitchClass::B, i32::MAX);
        assert_eq!(top.transpose(1), Note::new(PitchClass::C, i32::MAX));
        let high = Note::new(PitchClass::C, 300_000_000);
        assert_eq!(high.transpose(7), Note::new(PitchClass::G, 300_000_000));
        let bottom = Note::new(PitchClass::C, i32::MIN);
        assert_eq!(bottom.transpose(-1), Note::new(PitchClass::B, i32::MIN));
    }
}
