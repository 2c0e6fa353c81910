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

//! Computer keyboard shortcuts for the piano. The home row plays the white keys
//! and the row above plays the black keys.

use std::collections::HashMap;

use crate::note::{Note, PitchClass};

const DEFAULT_KEYS: [(char, PitchClass); 12] = [
    ('a', PitchClass::C),
    ('s', PitchClass::D),
    ('d', PitchClass::E),
    ('f', PitchClass::F),
    ('g', PitchClass::G),
    ('h', PitchClass::A),
    ('j', PitchClass::B),
    ('w', PitchClass::CSharp),
    ('e', PitchClass::DSharp),
    ('t', PitchClass::FSharp),
    ('y', PitchClass::GSharp),
    ('u', PitchClass::ASharp),
];

/// Maps physical keys to pitch classes.
#[derive(Debug, Clone)]
pub struct KeyMap {
    keys: HashMap<char, PitchClass>,
}

impl Default for KeyMap {
    fn default() -> Self {
        KeyMap {
            keys: DEFAULT_KEYS.into_iter().collect(),
        }
    }
}

impl KeyMap {
    /// Gets the pitch class for a key, ignoring case.
    pub fn pitch_for(&self, key: char) -> Option<PitchClass> {
        self.keys.get(&key.to_ascii_lowercase()).copied()
    }

    /// Gets the pitch class for a key code of the form "KeyA".
    pub fn pitch_for_code(&self, code: &str) -> Option<PitchClass> {
        let mut chars = code.strip_prefix("Key")?.chars();
        match (chars.next(), chars.next()) {
            (Some(key), None) => self.pitch_for(key),
            _ => None,
        }
    }

    /// Gets the note a key plays at the given octave.
    pub fn note_for(&self, key: char, octave: i32) -> Option<Note> {
        self.pitch_for(key).map(|pitch| Note::new(pitch, octave))
    }

    /// Returns true if every character of the input is a mapped key.
    pub fn is_key_sequence(&self, input: &str) -> bool {
        !input.is_empty() && input.chars().all(|key| self.pitch_for(key).is_some())
    }

    /// Lists the mapping sorted by pitch.
    pub fn bindings(&self) -> Vec<(char, PitchClass)> {
        let mut bindings: Vec<(char, PitchClass)> =
            self.keys.iter().map(|(key, pitch)| (*key, *pitch)).collect();
        bindings.sort_by_key(|(_, pitch)| *pitch);
        bindings
    }
}
