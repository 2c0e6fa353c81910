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

//! Oscillator voices and the mixer that sums them. This is backend independent
//! so it can be driven by the cpal output callback or directly by tests.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::ToneSpec;
use crate::envelope::Envelope;

/// The shape of the oscillator.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Samples the waveform at a phase in [0, 1).
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    -4.0 + 4.0 * phase
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Flags shared between a voice on the audio thread and the handle that controls it.
#[derive(Default)]
pub struct VoiceControl {
    released: AtomicBool,
    finished: AtomicBool,
}

impl VoiceControl {
    /// Asks the voice to start its release ramp.
    pub fn release(&self) {
        self.released.store(true, Ordering::Relaxed);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// A single oscillator with an envelope.
pub struct Voice {
    id: u64,
    waveform: Waveform,
    envelope: Envelope,
    sample_rate: u32,
    phase: f32,
    phase_increment: f32,
    /// Samples rendered so far.
    position: u64,
    /// Sample position and gain at the moment the release started.
    released_at: Option<(u64, f32)>,
    control: Arc<VoiceControl>,
}

impl Voice {
    /// Creates a voice and the control block used to release it.
    pub fn new(id: u64, spec: &ToneSpec, sample_rate: u32) -> (Voice, Arc<VoiceControl>) {
        let control = Arc::new(VoiceControl::default());
        let voice = Voice {
            id,
            waveform: spec.waveform,
            envelope: spec.envelope,
            sample_rate,
            phase: 0.0,
            phase_increment: (spec.frequency / sample_rate as f64) as f32,
            position: 0,
            released_at: None,
            control: control.clone(),
        };
        (voice, control)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn elapsed(&self, samples: u64) -> Duration {
        Duration::from_secs_f64(samples as f64 / self.sample_rate as f64)
    }

    /// Renders the next sample, or None once the voice has gone silent.
    pub fn next_sample(&mut self) -> Option<f32> {
        if self.released_at.is_none() && self.control.is_released() {
            let gain = self.envelope.gain_at(self.elapsed(self.position));
            self.released_at = Some((self.position, gain));
        }

        let gain = match self.released_at {
            Some((at, start_gain)) => {
                let since = self.elapsed(self.position - at);
                if since >= self.envelope.release() {
                    return None;
                }
                self.envelope.release_gain(start_gain, since)
            }
            None => {
                let elapsed = self.elapsed(self.position);
                if elapsed >= self.envelope.length() {
                    return None;
                }
                self.envelope.gain_at(elapsed)
            }
        };

        let sample = self.waveform.sample(self.phase) * gain;
        self.phase = (self.phase + self.phase_increment).fract();
        self.position += 1;
        Some(sample)
    }

    fn finish(&self) {
        self.control.finished.store(true, Ordering::Relaxed);
    }
}

/// Sums active voices into interleaved output frames. Every channel receives
/// the same mono signal.
pub struct Mixer {
    voices: Vec<Voice>,
    channels: usize,
}

impl Mixer {
    pub fn new(channels: u16) -> Mixer {
        Mixer {
            voices: Vec::new(),
            channels: channels.max(1) as usize,
        }
    }

    pub fn add(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Renders into an interleaved buffer, dropping voices that have finished.
    pub fn render(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.channels;

        self.voices.retain_mut(|voice| {
            for frame in output.chunks_mut(channels) {
                match voice.next_sample() {
                    Some(sample) => frame.iter_mut().for_each(|out| *out += sample),
                    None => {
                        voice.finish();
                        return false;
                    }
                }
            }
            true
        });

        output
            .iter_mut()
            .for_each(|sample| *sample = sample.clamp(-1.0, 1.0));
    }
}
