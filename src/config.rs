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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;
use tracing::info;

mod audio;
mod error;
mod tone;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::tone::{Tone, DEFAULT_CHORD_STAGGER, DEFAULT_VOLUME};

/// The configuration for the piano.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Piano {
    /// Where tones are played.
    #[serde(default)]
    audio: Audio,

    /// How tones sound.
    #[serde(default)]
    tone: Tone,
}

impl Piano {
    /// Replaces the audio section, e.g. with a device named on the command line.
    pub fn with_audio(mut self, audio: Audio) -> Piano {
        self.audio = audio;
        self
    }

    /// Parse the piano configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Piano, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Piano>()?)
    }

    /// Loads the configuration if a path was given, or falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Piano, ConfigError> {
        match path {
            Some(path) => {
                info!(path = %path.display(), "Loading config");
                Piano::deserialize(path)
            }
            None => Ok(Piano::default()),
        }
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn tone(&self) -> &Tone {
        &self.tone
    }
}
