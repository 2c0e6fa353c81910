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
use std::{fmt, str::FromStr};

use crate::error::ToneError;
use crate::note::{Note, PitchClass};

/// Roots listed by the chord book.
const NATURAL_ROOTS: [PitchClass; 7] = [
    PitchClass::C,
    PitchClass::D,
    PitchClass::E,
    PitchClass::F,
    PitchClass::G,
    PitchClass::A,
    PitchClass::B,
];

/// The chord qualities the tutorial teaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Major,
    Minor,
    Seventh,
}

impl Quality {
    /// Semitone offsets from the root.
    pub fn intervals(self) -> &'static [i32] {
        match self {
            Quality::Major => &[0, 4, 7],
            Quality::Minor => &[0, 3, 7],
            Quality::Seventh => &[0, 4, 7, 10],
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Quality::Major => "",
            Quality::Minor => "m",
            Quality::Seventh => "7",
        }
    }
}

/// A named chord: a root pitch class and a quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chord {
    root: PitchClass,
    quality: Quality,
}

impl Chord {
    pub fn new(root: PitchClass, quality: Quality) -> Chord {
        Chord { root, quality }
    }

    pub fn root(&self) -> PitchClass {
        self.root
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Voices the chord ascending from the root in the given octave.
    pub fn voicing(&self, octave: i32) -> Vec<Note> {
        let root = Note::new(self.root, octave);
        self.quality
            .intervals()
            .iter()
            .map(|interval| root.transpose(*interval))
            .collect()
    }

    /// Every chord in the book: major, minor and seventh chords on each natural root.
    pub fn book() -> Vec<Chord> {
        [Quality::Major, Quality::Minor, Quality::Seventh]
            .into_iter()
            .flat_map(|quality| NATURAL_ROOTS.map(|root| Chord::new(root, quality)))
            .collect()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.quality.suffix())
    }
}

impl FromStr for Chord {
    type Err = ToneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ToneError::UnknownChord(s.to_string());
        let name = s.trim();
        if !name.is_ascii() || name.is_empty() {
            return Err(unknown());
        }
        let split = if name.as_bytes().get(1) == Some(&b'#') {
            2
        } else {
            1
        };
        let (root, suffix) = name.split_at(split);
        let root = root.parse::<PitchClass>().map_err(|_| unknown())?;
        let quality = match suffix {
            "" => Quality::Major,
            "m" => Quality::Minor,
            "7" => Quality::Seventh,
            _ => return Err(unknown()),
        };
        Ok(Chord::new(root, quality))
    }
}
