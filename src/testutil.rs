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
    collections::BTreeSet,
    sync::Arc,
    time::{Duration, SystemTime},
};

use parking_lot::Mutex;

use crate::audio::mock;
use crate::clock::ManualClock;
use crate::engine::{Indicator, ToneEngine};

/// Records every indicator change.
#[derive(Clone, Default)]
pub struct RecordingIndicator {
    changes: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingIndicator {
    pub fn changes(&self) -> Vec<(String, bool)> {
        self.changes.lock().clone()
    }

    /// Notes whose indicator is currently on, sorted.
    pub fn lit(&self) -> Vec<String> {
        let mut lit = BTreeSet::new();
        for (note, active) in self.changes.lock().iter() {
            if *active {
                lit.insert(note.clone());
            } else {
                lit.remove(note);
            }
        }
        lit.into_iter().collect()
    }
}

impl Indicator for RecordingIndicator {
    fn set_active(&self, note: &str, active: bool) {
        self.changes.lock().push((note.to_string(), active));
    }
}

/// An engine wired to a mock device, a manual clock and a recording indicator.
pub struct TestEngine {
    pub engine: ToneEngine,
    pub device: mock::Device,
    pub clock: Arc<ManualClock>,
    pub indicator: RecordingIndicator,
}

pub fn mock_engine() -> TestEngine {
    let device = mock::Device::get("mock-test");
    let clock = Arc::new(ManualClock::new());
    let indicator = RecordingIndicator::default();
    let engine = ToneEngine::new(clock.clone(), Box::new(indicator.clone()))
        .with_device(Arc::new(device.clone()));
    TestEngine {
        engine,
        device,
        clock,
        indicator,
    }
}

/// Wait for the given async predicate to return true or fail.
pub async fn eventually_async<F, Fut>(mut predicate: F, error_msg: &str)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(5);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().unwrap_or_default();
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate().await {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}
