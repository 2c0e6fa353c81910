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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::debug;

use super::{Tone as AudioTone, ToneSpec};

/// Something that happened on a mock device.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started { id: u64, frequency: f64 },
    Released { id: u64 },
}

/// A mock device. Doesn't actually play anything, but records what it was asked to do.
#[derive(Clone)]
pub struct Device {
    name: String,
    events: Arc<Mutex<Vec<Event>>>,
    next_id: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            events: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes subsequent starts fail, as a device that went away would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Frequencies of every started tone, in order.
    pub fn started_frequencies(&self) -> Vec<f64> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Started { frequency, .. } => Some(*frequency),
                Event::Released { .. } => None,
            })
            .collect()
    }

    /// Number of tones started and not yet released.
    pub fn sounding_count(&self) -> usize {
        let events = self.events.lock();
        let started = events
            .iter()
            .filter(|event| matches!(event, Event::Started { .. }))
            .count();
        started - (events.len() - started)
    }
}

impl super::Device for Device {
    fn start(&self, spec: ToneSpec) -> Result<Box<dyn AudioTone>, Box<dyn Error>> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(format!("mock device {} is failing", self.name).into());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.events.lock().push(Event::Started {
            id,
            frequency: spec.frequency,
        });
        debug!(device = self.name, id, frequency = spec.frequency, "Tone started");

        Ok(Box::new(Tone {
            id,
            events: self.events.clone(),
            released: AtomicBool::new(false),
        }))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

/// A tone on the mock device. Finishes when it's released.
struct Tone {
    id: u64,
    events: Arc<Mutex<Vec<Event>>>,
    released: AtomicBool,
}

impl AudioTone for Tone {
    fn id(&self) -> u64 {
        self.id
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::Relaxed) {
            self.events.lock().push(Event::Released { id: self.id });
        }
    }

    fn is_finished(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }
}
