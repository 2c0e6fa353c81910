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

//! The tone engine. Turns note identifiers into sounding tones, keeps at most one
//! tone per identifier and fires staggered chord notes as time passes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::audio::{self, Device, Tone, ToneSpec, Waveform};
use crate::chord::Chord;
use crate::clock::Clock;
use crate::config::{self, ConfigError, DEFAULT_CHORD_STAGGER, DEFAULT_VOLUME};
use crate::envelope::Envelope;
use crate::error::ToneError;
use crate::note::{self, Lookup, Note, REFERENCE_OCTAVE};
use crate::schedule::{ChordHandle, Timeline};

pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 8;

/// Shows which notes are sounding, e.g. by lighting a key on screen.
pub trait Indicator: Send {
    fn set_active(&self, note: &str, active: bool);
}

/// An indicator that only logs.
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set_active(&self, note: &str, active: bool) {
        debug!(note, active, "Indicator");
    }
}

/// The outcome of a successful play.
#[derive(Debug, Clone, PartialEq)]
pub struct Played {
    /// The frequency the tone was started at.
    pub hz: f64,
    /// True if a tone for the same note was released to make room.
    pub replaced: bool,
    /// Set when the fallback frequency was used.
    pub warning: Option<ToneError>,
}

/// A tone owned by the engine.
struct ActiveTone {
    tone: Box<dyn Tone>,
    /// When the envelope runs out if the tone is never released.
    expires_at: Duration,
}

pub struct ToneEngine {
    /// The backend, or why there isn't one.
    device: Result<Arc<dyn Device>, ToneError>,
    /// Sounding tones keyed by note identifier.
    active: HashMap<String, ActiveTone>,
    timeline: Timeline,
    clock: Arc<dyn Clock>,
    indicator: Box<dyn Indicator>,
    octave: i32,
    volume: f32,
    envelope: Envelope,
    waveform: Waveform,
    chord_stagger: Duration,
    /// Notes played since the last clear.
    played: Vec<String>,
}

impl ToneEngine {
    /// Creates an engine with default settings and no backend. Every play fails
    /// until a device is attached.
    pub fn new(clock: Arc<dyn Clock>, indicator: Box<dyn Indicator>) -> ToneEngine {
        ToneEngine {
            device: Err(ToneError::BackendUnavailable(
                "no audio device configured".to_string(),
            )),
            active: HashMap::new(),
            timeline: Timeline::new(),
            clock,
            indicator,
            octave: REFERENCE_OCTAVE,
            volume: DEFAULT_VOLUME,
            envelope: Envelope::default(),
            waveform: Waveform::default(),
            chord_stagger: DEFAULT_CHORD_STAGGER,
            played: Vec::new(),
        }
    }

    /// Attaches a backend.
    pub fn with_device(mut self, device: Arc<dyn Device>) -> ToneEngine {
        self.device = Ok(device);
        self
    }

    /// Applies the tone section of the configuration.
    pub fn with_tone_config(mut self, tone: &config::Tone) -> Result<ToneEngine, ConfigError> {
        self.envelope = tone.envelope()?;
        self.chord_stagger = tone.chord_stagger()?;
        self.waveform = tone.waveform();
        self.set_octave(tone.octave());
        self.set_volume(tone.volume());
        Ok(self)
    }

    /// Builds an engine from the configuration. A device that can't be opened
    /// is logged and leaves the engine without a backend.
    pub fn from_config(
        config: &config::Piano,
        clock: Arc<dyn Clock>,
        indicator: Box<dyn Indicator>,
    ) -> Result<ToneEngine, ConfigError> {
        let mut engine = ToneEngine::new(clock, indicator).with_tone_config(config.tone())?;
        engine.device = audio::get_device(config.audio());
        match &engine.device {
            Ok(device) => info!(device = device.to_string(), "Tone engine ready"),
            Err(e) => error!(err = %e, "Tone backend unavailable, playback disabled"),
        }
        Ok(engine)
    }

    /// Plays a note identifier such as "C#4". Any tone already sounding for the
    /// same note is released first. Unknown notes play at the fallback frequency
    /// and report a warning. Out-of-range notes are not played.
    pub fn play(&mut self, id: &str) -> Result<Played, ToneError> {
        let device = match &self.device {
            Ok(device) => device.clone(),
            Err(e) => {
                debug!(note = id, err = %e, "Ignoring play without a backend");
                return Err(e.clone());
            }
        };

        let (key, lookup) = match id.parse::<Note>() {
            Ok(note) => {
                let hz = note
                    .frequency()
                    .inspect_err(|e| warn!(err = %e, "Not playing note"))?;
                (note.to_string(), Lookup { hz, warning: None })
            }
            Err(_) => (id.trim().to_string(), note::frequency_of_id(id)),
        };

        let replaced = self.release_active(&key);

        let spec = ToneSpec {
            frequency: lookup.hz,
            envelope: self.envelope.scaled(self.volume),
            waveform: self.waveform,
        };
        let tone = device.start(spec).map_err(|e| {
            error!(note = key, err = %e, "Unable to start tone");
            ToneError::Backend(e.to_string())
        })?;

        debug!(note = key, hz = lookup.hz, id = tone.id(), replaced, "Playing");
        self.active.insert(
            key.clone(),
            ActiveTone {
                tone,
                expires_at: self.clock.now() + self.envelope.length(),
            },
        );
        self.indicator.set_active(&key, true);
        self.played.push(key);

        Ok(Played {
            hz: lookup.hz,
            replaced,
            warning: lookup.warning,
        })
    }

    pub fn play_note(&mut self, note: Note) -> Result<Played, ToneError> {
        self.play(&note.to_string())
    }

    /// Releases the tone for a note. Returns false if nothing was sounding.
    pub fn release(&mut self, id: &str) -> bool {
        let key = match id.parse::<Note>() {
            Ok(note) => note.to_string(),
            Err(_) => id.trim().to_string(),
        };
        self.release_active(&key)
    }

    fn release_active(&mut self, key: &str) -> bool {
        match self.active.remove(key) {
            Some(active) => {
                active.tone.release();
                self.indicator.set_active(key, false);
                debug!(note = key, "Released");
                true
            }
            None => false,
        }
    }

    /// Queues notes `stagger` apart starting now. Nothing sounds until `tick`.
    pub fn play_chord<S: AsRef<str>>(&mut self, notes: &[S], stagger: Duration) -> ChordHandle {
        self.timeline
            .schedule_staggered(notes, self.clock.now(), stagger)
    }

    /// Plays a chord from the chord book at the current octave.
    pub fn play_named_chord(&mut self, name: &str) -> Result<ChordHandle, ToneError> {
        let chord = name
            .parse::<Chord>()
            .inspect_err(|e| warn!(err = %e, "Not playing chord"))?;
        let notes: Vec<String> = chord
            .voicing(self.octave)
            .iter()
            .map(Note::to_string)
            .collect();
        info!(chord = %chord, notes = ?notes, "Playing chord");
        Ok(self.play_chord(&notes, self.chord_stagger))
    }

    /// Fires scheduled notes that are due and reaps tones that have finished.
    /// Returns how many notes were fired.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();

        let due = self.timeline.pop_due(now);
        for scheduled in due.iter() {
            // Failures are logged by play.
            let _ = self.play(scheduled.note());
        }

        let finished: Vec<String> = self
            .active
            .iter()
            .filter(|(_, active)| active.tone.is_finished() || now >= active.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in finished {
            self.active.remove(&key);
            self.indicator.set_active(&key, false);
            debug!(note = key, "Tone finished");
        }

        due.len()
    }

    /// Cancels every scheduled note and forgets the played history. Sounding
    /// tones are left to ring out.
    pub fn clear(&mut self) {
        let cancelled = self.timeline.cancel_all();
        self.played.clear();
        info!(cancelled, "Cleared");
    }

    /// Clears and releases every sounding tone.
    pub fn stop_all(&mut self) {
        self.clear();
        let keys: Vec<String> = self.active.keys().cloned().collect();
        let stopped = keys.len();
        for key in keys {
            self.release_active(&key);
        }
        info!(stopped, "All tones stopped");
    }

    /// Sets the octave, clamped to the keyboard's range.
    pub fn set_octave(&mut self, octave: i32) {
        self.octave = octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
    }

    /// Sets the master volume, clamped to 0.0..=1.0. Applies to tones started afterwards.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn chord_stagger(&self) -> Duration {
        self.chord_stagger
    }

    pub fn is_available(&self) -> bool {
        self.device.is_ok()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: &str) -> bool {
        match id.parse::<Note>() {
            Ok(note) => self.active.contains_key(&note.to_string()),
            Err(_) => self.active.contains_key(id.trim()),
        }
    }

    /// Sounding notes, sorted.
    pub fn active_notes(&self) -> Vec<&str> {
        let mut notes: Vec<&str> = self.active.keys().map(String::as_str).collect();
        notes.sort();
        notes
    }

    /// Scheduled notes that haven't fired yet, with their due times.
    pub fn pending(&self) -> Vec<(Duration, &str)> {
        self.timeline.pending()
    }

    /// Notes played since the last clear, in order.
    pub fn played(&self) -> &[String] {
        &self.played
    }

    /// True when nothing is sounding or scheduled.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.timeline.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::mock::Event;
    use crate::testutil::{mock_engine, TestEngine};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_play_starts_tone_and_lights_key() {
        let TestEngine {
            mut engine,
            device,
            indicator,
            ..
        } = mock_engine();

        let played = engine.play("A4").unwrap();
        assert_eq!(played.hz, 440.0);
        assert!(!played.replaced);
        assert!(played.warning.is_none());
        assert!(engine.is_active("A4"));
        assert_eq!(device.started_frequencies(), vec![440.0]);
        assert_eq!(indicator.changes(), vec![("A4".to_string(), true)]);
        assert_eq!(engine.played(), &["A4".to_string()]);
    }

    #[test]
    fn test_play_twice_keeps_one_tone() {
        let TestEngine {
            mut engine, device, ..
        } = mock_engine();

        engine.play("C4").unwrap();
        let second = engine.play("C4").unwrap();
        assert!(second.replaced);
        assert_eq!(engine.active_count(), 1);
        assert_eq!(device.sounding_count(), 1);
        assert_eq!(
            device.events(),
            vec![
                Event::Started {
                    id: 1,
                    frequency: 261.63
                },
                Event::Released { id: 1 },
                Event::Started {
                    id: 2,
                    frequency: 261.63
                },
            ]
        );
    }

    #[test]
    fn test_release() {
        let TestEngine {
            mut engine,
            device,
            indicator,
            ..
        } = mock_engine();

        assert!(!engine.release("E4"));
        assert!(device.events().is_empty());

        engine.play("E4").unwrap();
        assert!(engine.release(" E4 "));
        assert_eq!(engine.active_count(), 0);
        assert_eq!(device.sounding_count(), 0);
        assert_eq!(indicator.lit(), Vec::<String>::new());
        assert!(!engine.release("E4"));
    }

    #[test]
    fn test_unknown_note_uses_fallback() {
        let TestEngine {
            mut engine, device, ..
        } = mock_engine();

        let played = engine.play("H4").unwrap();
        assert_eq!(played.hz, 440.0);
        assert_eq!(
            played.warning,
            Some(ToneError::UnknownNote("H4".to_string()))
        );
        assert!(engine.is_active("H4"));
        assert_eq!(device.started_frequencies(), vec![440.0]);
        assert!(engine.release("H4"));
    }

    #[test]
    fn test_out_of_range_note_is_not_played() {
        let TestEngine {
            mut engine, device, ..
        } = mock_engine();

        let result = engine.play("C-2");
        assert!(matches!(result, Err(ToneError::InvalidFrequency { .. })));
        for note in ["C-2147483648", "B2147483647"] {
            assert!(matches!(
                engine.play(note),
                Err(ToneError::InvalidFrequency { .. })
            ));
        }
        assert_eq!(engine.active_count(), 0);
        assert!(device.events().is_empty());
        assert!(engine.played().is_empty());
    }

    #[test]
    fn test_chord_is_staggered() {
        let TestEngine {
            mut engine,
            device,
            clock,
            ..
        } = mock_engine();

        let chord = engine.play_chord(&["C4", "E4", "G4"], ms(100));
        assert_eq!(chord.notes(), vec!["C4", "E4", "G4"]);
        assert_eq!(
            engine.pending(),
            vec![(ms(0), "C4"), (ms(100), "E4"), (ms(200), "G4")]
        );
        assert!(device.events().is_empty());

        assert_eq!(engine.tick(), 1);
        clock.advance(ms(99));
        assert_eq!(engine.tick(), 0);
        clock.advance(ms(1));
        assert_eq!(engine.tick(), 1);
        clock.advance(ms(100));
        assert_eq!(engine.tick(), 1);

        assert_eq!(device.started_frequencies(), vec![261.63, 329.63, 392.0]);
        assert_eq!(engine.played(), &["C4", "E4", "G4"]);
        assert_eq!(engine.active_count(), 3);
    }

    #[test]
    fn test_named_chord_uses_octave_and_stagger() {
        let TestEngine { mut engine, .. } = mock_engine();

        engine.set_octave(3);
        let chord = engine.play_named_chord("Am").unwrap();
        assert_eq!(chord.notes(), vec!["A3", "C4", "E4"]);
        assert_eq!(
            engine.pending(),
            vec![(ms(0), "A3"), (ms(100), "C4"), (ms(200), "E4")]
        );

        assert!(matches!(
            engine.play_named_chord("Hm"),
            Err(ToneError::UnknownChord(_))
        ));
        assert_eq!(engine.pending().len(), 3);
    }

    #[test]
    fn test_cancelled_chord_notes_never_fire() {
        let TestEngine {
            mut engine,
            device,
            clock,
            ..
        } = mock_engine();

        let chord = engine.play_chord(&["C4", "E4", "G4"], ms(100));
        engine.tick();
        chord.cancel();
        clock.advance(ms(500));
        assert_eq!(engine.tick(), 0);
        assert_eq!(device.started_frequencies(), vec![261.63]);
    }

    #[test]
    fn test_clear_drops_pending_notes_and_history() {
        let TestEngine {
            mut engine,
            device,
            clock,
            ..
        } = mock_engine();

        engine.play_chord(&["F4", "A4", "C5"], ms(100));
        engine.tick();
        engine.clear();
        assert!(engine.pending().is_empty());
        assert!(engine.played().is_empty());

        // The note that already fired keeps ringing.
        assert!(engine.is_active("F4"));
        clock.advance(ms(300));
        engine.tick();
        assert_eq!(device.started_frequencies(), vec![349.23]);
    }

    #[test]
    fn test_stop_all_releases_everything() {
        let TestEngine {
            mut engine,
            device,
            indicator,
            ..
        } = mock_engine();

        engine.play("C4").unwrap();
        engine.play("D#4").unwrap();
        engine.play_chord(&["G4"], ms(100));
        engine.stop_all();

        assert!(engine.is_idle());
        assert_eq!(device.sounding_count(), 0);
        assert!(indicator.lit().is_empty());
    }

    #[test]
    fn test_tones_expire_after_envelope() {
        let TestEngine {
            mut engine,
            clock,
            indicator,
            ..
        } = mock_engine();

        engine.play("B4").unwrap();
        clock.advance(ms(999));
        engine.tick();
        assert!(engine.is_active("B4"));

        clock.advance(ms(1));
        engine.tick();
        assert!(!engine.is_active("B4"));
        assert!(engine.is_idle());
        assert!(indicator.lit().is_empty());
    }

    #[test]
    fn test_unavailable_backend() {
        let TestEngine { clock, .. } = mock_engine();
        let mut engine = ToneEngine::new(clock, Box::new(LogIndicator));

        assert!(!engine.is_available());
        assert!(matches!(
            engine.play("C4"),
            Err(ToneError::BackendUnavailable(_))
        ));
        assert!(!engine.release("C4"));
        assert_eq!(engine.active_count(), 0);

        // Chords still schedule, and firing them is a no-op.
        engine.play_named_chord("C").unwrap();
        engine.tick();
        assert_eq!(engine.active_count(), 0);
    }

    #[test]
    fn test_failing_backend_registers_nothing() {
        let TestEngine {
            mut engine, device, ..
        } = mock_engine();

        device.set_failing(true);
        assert!(matches!(engine.play("C4"), Err(ToneError::Backend(_))));
        assert_eq!(engine.active_count(), 0);
        assert!(engine.played().is_empty());
    }

    #[test]
    fn test_settings_are_clamped() {
        let TestEngine { mut engine, .. } = mock_engine();

        engine.set_octave(12);
        assert_eq!(engine.octave(), MAX_OCTAVE);
        engine.set_octave(-3);
        assert_eq!(engine.octave(), MIN_OCTAVE);
        engine.set_volume(1.5);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(f32::NAN);
        assert_eq!(engine.volume(), 0.0);
    }

    #[test]
    fn test_from_config() {
        let config = config::Piano::default().with_audio(config::Audio::new(audio::NO_DEVICE));
        let TestEngine { clock, .. } = mock_engine();
        let engine =
            ToneEngine::from_config(&config, clock.clone(), Box::new(LogIndicator)).unwrap();
        assert!(!engine.is_available());
        assert_eq!(engine.octave(), REFERENCE_OCTAVE);
        assert_eq!(engine.chord_stagger(), DEFAULT_CHORD_STAGGER);

        let config = config::Piano::default().with_audio(config::Audio::new("mock-test"));
        let engine = ToneEngine::from_config(&config, clock, Box::new(LogIndicator)).unwrap();
        assert!(engine.is_available());
    }
}
