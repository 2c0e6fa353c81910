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

//! Amplitude envelopes. A tone rises linearly to its peak over the attack window,
//! then decays exponentially toward the floor. Releasing a tone ramps it from
//! wherever it currently is down to the floor.

use std::time::Duration;

pub const DEFAULT_ATTACK: Duration = Duration::from_millis(10);
pub const DEFAULT_DECAY: Duration = Duration::from_millis(990);
pub const DEFAULT_RELEASE: Duration = Duration::from_millis(100);
pub const DEFAULT_PEAK_GAIN: f32 = 0.3;
pub const DEFAULT_FLOOR_GAIN: f32 = 0.001;

/// The shape of a tone's amplitude over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    peak: f32,
    floor: f32,
    attack: Duration,
    decay: Duration,
    release: Duration,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope {
            peak: DEFAULT_PEAK_GAIN,
            floor: DEFAULT_FLOOR_GAIN,
            attack: DEFAULT_ATTACK,
            decay: DEFAULT_DECAY,
            release: DEFAULT_RELEASE,
        }
    }
}

impl Envelope {
    /// Creates a new envelope. The floor is kept strictly positive and below the
    /// peak so the exponential segments stay well defined.
    pub fn new(
        peak: f32,
        floor: f32,
        attack: Duration,
        decay: Duration,
        release: Duration,
    ) -> Envelope {
        let peak = peak.max(0.0);
        Envelope {
            peak,
            floor: floor.clamp(f32::MIN_POSITIVE, peak.max(f32::MIN_POSITIVE)),
            attack,
            decay,
            release,
        }
    }

    /// Returns a copy with the peak scaled, e.g. by the master volume.
    pub fn scaled(&self, volume: f32) -> Envelope {
        Envelope::new(
            self.peak * volume.clamp(0.0, 1.0),
            self.floor,
            self.attack,
            self.decay,
            self.release,
        )
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn attack(&self) -> Duration {
        self.attack
    }

    pub fn decay(&self) -> Duration {
        self.decay
    }

    pub fn release(&self) -> Duration {
        self.release
    }

    /// How long an unreleased tone sounds.
    pub fn length(&self) -> Duration {
        self.attack + self.decay
    }

    /// Gain of an unreleased tone `elapsed` after it started. Zero once the decay
    /// has finished.
    pub fn gain_at(&self, elapsed: Duration) -> f32 {
        if elapsed < self.attack {
            return self.peak * (elapsed.as_secs_f32() / self.attack.as_secs_f32());
        }
        let since_attack = elapsed - self.attack;
        if since_attack >= self.decay {
            return 0.0;
        }
        exponential_ramp(
            self.peak,
            self.floor,
            since_attack.as_secs_f32() / self.decay.as_secs_f32(),
        )
    }

    /// Gain `since_release` after a tone was released at `start_gain`. Zero once
    /// the release window has passed.
    pub fn release_gain(&self, start_gain: f32, since_release: Duration) -> f32 {
        if since_release >= self.release {
            return 0.0;
        }
        exponential_ramp(
            start_gain,
            self.floor,
            since_release.as_secs_f32() / self.release.as_secs_f32(),
        )
    }
}

/// Exponential interpolation from `from` to `to`, `progress` in [0, 1).
fn exponential_ramp(from: f32, to: f32, progress: f32) -> f32 {
    if from <= 0.0 || to <= 0.0 {
        return 0.0;
    }
    from * (to / from).powf(progress)
}
