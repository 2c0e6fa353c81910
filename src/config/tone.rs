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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::audio::Waveform;
use crate::envelope::{self, Envelope};
use crate::note::REFERENCE_OCTAVE;

pub const DEFAULT_VOLUME: f32 = 0.7;
pub const DEFAULT_CHORD_STAGGER: Duration = Duration::from_millis(100);

/// Tone settings: where the keyboard sits, how loud it is and how notes are shaped.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Tone {
    /// The octave the keyboard and chords start at.
    octave: Option<i32>,

    /// Master volume, 0.0 to 1.0.
    volume: Option<f32>,

    /// Oscillator shape.
    waveform: Option<Waveform>,

    /// Delay between the notes of a chord, e.g. "100ms".
    chord_stagger: Option<String>,

    /// Envelope overrides.
    envelope: Option<EnvelopeShape>,
}

/// A YAML representation of an envelope. Unset fields keep their defaults.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EnvelopeShape {
    peak: Option<f32>,
    floor: Option<f32>,
    attack: Option<String>,
    decay: Option<String>,
    release: Option<String>,
}

fn parse_duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.clone())
            .map(Duration::from)
            .map_err(|_| ConfigError::InvalidDuration {
                field,
                value: value.clone(),
            }),
        None => Ok(default),
    }
}

impl Tone {
    pub fn octave(&self) -> i32 {
        self.octave.unwrap_or(REFERENCE_OCTAVE)
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform.unwrap_or_default()
    }

    /// Returns the chord stagger (default: 100ms).
    pub fn chord_stagger(&self) -> Result<Duration, ConfigError> {
        parse_duration("chord_stagger", &self.chord_stagger, DEFAULT_CHORD_STAGGER)
    }

    /// Returns the unscaled envelope. The engine applies the volume.
    pub fn envelope(&self) -> Result<Envelope, ConfigError> {
        let shape = self.envelope.clone().unwrap_or_default();
        Ok(Envelope::new(
            shape.peak.unwrap_or(envelope::DEFAULT_PEAK_GAIN),
            shape.floor.unwrap_or(envelope::DEFAULT_FLOOR_GAIN),
            parse_duration("envelope.attack", &shape.attack, envelope::DEFAULT_ATTACK)?,
            parse_duration("envelope.decay", &shape.decay, envelope::DEFAULT_DECAY)?,
            parse_duration("envelope.release", &shape.release, envelope::DEFAULT_RELEASE)?,
        ))
    }
}
