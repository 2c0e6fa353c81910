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
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{interval, MissedTickBehavior};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, warn, Level};

use crate::engine::ToneEngine;
use crate::keymap::KeyMap;

pub mod keyboard;

/// How often the engine's timers are driven.
pub const TICK_INTERVAL: Duration = Duration::from_millis(5);

/// Controller events that will trigger behavior in the tone engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A computer key was pressed. Plays the mapped note at the current octave.
    Key(char),

    /// Plays a note identifier.
    Play(String),

    /// Releases a note identifier.
    Release(String),

    /// Plays a named chord at the current octave.
    Chord(String),

    /// Moves the keyboard to an octave.
    Octave(i32),

    /// Sets the master volume, 0.0 to 1.0.
    Volume(f32),

    /// Drops scheduled notes and the played history.
    Clear,

    /// Silences everything.
    Stop,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Owns the tone engine and feeds it events from a driver.
pub struct Controller {
    handle: JoinHandle<ToneEngine>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(engine: ToneEngine, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(async move { Controller::trigger_events(engine, driver).await }),
        }
    }

    /// Join will block until the driver closes. Returns the engine, silenced.
    pub async fn join(&mut self) -> Result<ToneEngine, JoinError> {
        (&mut self.handle).await
    }

    /// Applies driver events in arrival order and ticks the engine in between.
    async fn trigger_events(mut engine: ToneEngine, driver: Arc<dyn Driver>) -> ToneEngine {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let keymap = KeyMap::default();
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let join_handle = driver.monitor_events(events_tx);

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(octave = engine.octave(), "Controller started.");

        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(event) => {
                        info!(event = ?event, "Received event.");
                        Controller::apply(&mut engine, &keymap, event);
                    }
                    None => {
                        info!("Controller closing.");
                        engine.stop_all();
                        match join_handle.await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => error!("Event monitor failed: {}", e),
                            Err(e) => error!("Error waiting for event monitor to stop: {}", e),
                        }
                        return engine;
                    }
                },
                _ = ticker.tick() => {
                    engine.tick();
                }
            }
        }
    }

    fn apply(engine: &mut ToneEngine, keymap: &KeyMap, event: Event) {
        let result = match event {
            Event::Key(key) => match keymap.note_for(key, engine.octave()) {
                Some(note) => engine.play_note(note).map(|_| ()),
                None => {
                    warn!(key = %key, "Unmapped key");
                    Ok(())
                }
            },
            Event::Play(note) => engine.play(&note).map(|_| ()),
            Event::Release(note) => {
                engine.release(&note);
                Ok(())
            }
            Event::Chord(name) => engine.play_named_chord(&name).map(|_| ()),
            Event::Octave(octave) => {
                engine.set_octave(octave);
                info!(octave = engine.octave(), "Octave changed");
                Ok(())
            }
            Event::Volume(volume) => {
                engine.set_volume(volume);
                info!(volume = engine.volume(), "Volume changed");
                Ok(())
            }
            Event::Clear => {
                engine.clear();
                Ok(())
            }
            Event::Stop => {
                engine.stop_all();
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Error talking to tone engine: {}", e);
        }
    }
}

/// Ticks the engine until nothing is sounding or scheduled. Used to let a
/// one-off note or chord ring out.
pub async fn run_until_idle(mut engine: ToneEngine) -> ToneEngine {
    let mut ticker = interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    engine.tick();
    while !engine.is_idle() {
        ticker.tick().await;
        engine.tick();
    }
    engine
}
