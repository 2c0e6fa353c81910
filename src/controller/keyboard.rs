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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::keymap::KeyMap;

const CHORD: &str = "chord";
const PLAY: &str = "play";
const RELEASE: &str = "release";
const OCTAVE: &str = "octave";
const VOLUME: &str = "volume";
const CLEAR: &str = "clear";
const STOP: &str = "stop";
const QUIT: &str = "quit";

/// What a line of input asked for.
#[derive(Debug, PartialEq)]
enum Input {
    Events(Vec<Event>),
    Quit,
}

/// A driver that plays the piano from lines typed on the terminal. A line made
/// only of mapped keys presses each key in turn.
pub struct Driver {
    keymap: KeyMap,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            keymap: KeyMap::default(),
        }
    }

    fn parse_line(keymap: &KeyMap, line: &str) -> Result<Input, String> {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, Some(argument.trim())),
            None => (line, None),
        };

        let event = match (command.to_lowercase().as_str(), argument) {
            (QUIT, None) => return Ok(Input::Quit),
            (CLEAR, None) => Event::Clear,
            (STOP, None) => Event::Stop,
            (CHORD, Some(name)) => Event::Chord(name.to_string()),
            (PLAY, Some(note)) => Event::Play(note.to_string()),
            (RELEASE, Some(note)) => Event::Release(note.to_string()),
            (OCTAVE, Some(octave)) => Event::Octave(
                octave
                    .parse::<i32>()
                    .map_err(|_| format!("invalid octave {}", octave))?,
            ),
            (VOLUME, Some(percent)) => {
                let percent = percent
                    .trim_end_matches('%')
                    .parse::<f32>()
                    .map_err(|_| format!("invalid volume {}", percent))?;
                Event::Volume(percent / 100.0)
            }
            _ if keymap.pitch_for_code(line).is_some() => {
                return Ok(Input::Events(line.chars().last().map(Event::Key).into_iter().collect()))
            }
            _ if keymap.is_key_sequence(line) => {
                return Ok(Input::Events(line.chars().map(Event::Key).collect()))
            }
            _ => return Err(format!("unrecognized input {}", line)),
        };
        Ok(Input::Events(vec![event]))
    }

    /// Reads one line and forwards its events. Returns false once input ends.
    fn monitor_io<R, W>(
        keymap: &KeyMap,
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Keys ({}) or command ({} <name>, {} <note>, {} <note>, {} <n>, {} <percent>, {}, {}, {}): ",
            keymap
                .bindings()
                .iter()
                .map(|(key, _)| key)
                .collect::<String>(),
            CHORD,
            PLAY,
            RELEASE,
            OCTAVE,
            VOLUME,
            CLEAR,
            STOP,
            QUIT,
        )?;
        writer.flush()?;

        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match Driver::parse_line(keymap, &input) {
            Ok(Input::Quit) => Ok(false),
            Ok(Input::Events(events)) => {
                for event in events {
                    events_tx.blocking_send(event).map_err(io::Error::other)?;
                }
                Ok(true)
            }
            Err(e) => {
                warn!(input = input.trim(), err = %e, "Unrecognized input");
                Ok(true)
            }
        }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let keymap = self.keymap.clone();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&keymap, &events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufReader};

    use tokio::sync::mpsc;

    use super::*;

    fn get_events(input: &str) -> Result<(bool, Vec<Event>), io::Error> {
        let (sender, mut receiver) = mpsc::channel::<Event>(16);

        let reader = BufReader::new(input.as_bytes());
        let mut writer: Vec<u8> = Vec::new();
        let more = Driver::monitor_io(&KeyMap::default(), &sender, reader, &mut writer)?;
        assert!(!writer.is_empty());

        // Force the sender to close.
        drop(sender);
        let mut events = Vec::new();
        while let Some(event) = receiver.blocking_recv() {
            events.push(event);
        }
        Ok((more, events))
    }

    #[test]
    fn test_commands() -> Result<(), io::Error> {
        assert_eq!(
            (true, vec![Event::Chord("Am".to_string())]),
            get_events("chord Am\n")?
        );
        assert_eq!(
            (true, vec![Event::Play("C#4".to_string())]),
            get_events("PLAY C#4\n")?
        );
        assert_eq!(
            (true, vec![Event::Release("C#4".to_string())]),
            get_events("release   C#4\n")?
        );
        assert_eq!((true, vec![Event::Octave(3)]), get_events("octave 3\n")?);
        assert_eq!((true, vec![Event::Volume(0.5)]), get_events("volume 50%\n")?);
        assert_eq!((true, vec![Event::Clear]), get_events("clear\n")?);
        assert_eq!((true, vec![Event::Stop]), get_events("stop\n")?);
        Ok(())
    }

    #[test]
    fn test_key_sequences() -> Result<(), io::Error> {
        assert_eq!(
            (true, vec![Event::Key('a'), Event::Key('d'), Event::Key('g')]),
            get_events("adg\n")?
        );
        assert_eq!((true, vec![Event::Key('w')]), get_events("w\n")?);
        assert_eq!((true, vec![Event::Key('T')]), get_events("KeyT\n")?);
        Ok(())
    }

    #[test]
    fn test_unrecognized_input_is_skipped() -> Result<(), io::Error> {
        assert_eq!((true, vec![]), get_events("unrecognized\n")?);
        assert_eq!((true, vec![]), get_events("octave high\n")?);
        assert_eq!((true, vec![]), get_events("chord\n")?);
        assert_eq!((true, vec![]), get_events("\n")?);
        Ok(())
    }

    #[test]
    fn test_end_of_input() -> Result<(), io::Error> {
        assert_eq!((false, vec![]), get_events("")?);
        assert_eq!((false, vec![]), get_events("quit\n")?);
        Ok(())
    }
}
