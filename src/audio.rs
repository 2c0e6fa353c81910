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
use std::{error::Error, fmt, sync::Arc};

use crate::config;
use crate::envelope::Envelope;
use crate::error::ToneError;

pub mod cpal;
pub mod mock;
pub mod synth;

pub use synth::Waveform;

/// Device name that disables audio output entirely.
pub const NO_DEVICE: &str = "none";

/// Device name that selects the host's default output device.
pub const DEFAULT_DEVICE: &str = "default";

/// Everything a backend needs to start a tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    /// Frequency in Hz. Already validated by the caller.
    pub frequency: f64,
    /// The amplitude envelope, already scaled by the master volume.
    pub envelope: Envelope,
    /// The oscillator shape.
    pub waveform: Waveform,
}

/// A tone that is currently sounding on a device.
pub trait Tone: Send {
    /// Unique ID for this tone.
    fn id(&self) -> u64;

    /// Ramps the tone down over its envelope's release window and then stops it.
    fn release(&self);

    /// Returns true once the device has stopped emitting the tone.
    fn is_finished(&self) -> bool;
}

/// A backend capable of generating tones.
pub trait Device: fmt::Display + Send + Sync {
    /// Starts emitting a tone. The tone decays on its own after the envelope's
    /// length unless it's released first.
    fn start(&self, spec: ToneSpec) -> Result<Box<dyn Tone>, Box<dyn Error>>;
}

/// Lists the output devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the device described by the given configuration. A device named
/// "none" is reported as unavailable.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, ToneError> {
    let device = config.device();
    if device == NO_DEVICE {
        return Err(ToneError::BackendUnavailable(
            "audio output is disabled".to_string(),
        ));
    }
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    }

    match cpal::Device::get(config) {
        Ok(device) => Ok(Arc::new(device)),
        Err(e) => Err(ToneError::BackendUnavailable(e.to_string())),
    }
}
