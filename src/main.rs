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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};

use musnote::audio;
use musnote::chord::Chord;
use musnote::clock::SystemClock;
use musnote::config::{Audio, Piano};
use musnote::controller::{keyboard, run_until_idle, Controller};
use musnote::engine::{LogIndicator, ToneEngine};
use musnote::keymap::KeyMap;
use musnote::note::{self, REFERENCE_OCTAVE};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A piano and chord player for practicing music theory."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the frequency of each note, e.g. C#4.
    Frequency {
        /// The notes to look up.
        #[arg(required = true)]
        notes: Vec<String>,
    },
    /// Lists the chord book with each chord's notes.
    Chords {
        /// The octave to voice the chords from.
        #[arg(short, long, default_value_t = REFERENCE_OCTAVE)]
        octave: i32,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Plays notes together and waits for them to ring out.
    Play {
        /// The notes to play, e.g. C4 E4 G4.
        #[arg(required = true)]
        notes: Vec<String>,
        /// The path to the piano config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The device to play through. Overrides the config.
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Plays a chord from the chord book, one note after another.
    Chord {
        /// The chord name, e.g. Am or G7.
        name: String,
        /// The path to the piano config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The device to play through. Overrides the config.
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Start plays the piano from the terminal keyboard.
    Start {
        /// The path to the piano config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The device to play through. Overrides the config.
        #[arg(short, long)]
        device: Option<String>,
    },
}

/// Builds a tone engine from the optional config file and device override.
fn init_engine(
    config: Option<PathBuf>,
    device: Option<String>,
) -> Result<ToneEngine, Box<dyn Error>> {
    let mut piano = Piano::load(config.as_deref())?;
    if let Some(device) = device {
        piano = piano.with_audio(Audio::new(&device));
    }
    Ok(ToneEngine::from_config(
        &piano,
        Arc::new(SystemClock::new()),
        Box::new(LogIndicator),
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Frequency { notes } => {
            for id in notes.iter() {
                let lookup = note::frequency_of_id(id);
                match lookup.warning {
                    Some(warning) => println!("{}: {:.2} Hz ({})", id, lookup.hz, warning),
                    None => println!("{}: {:.2} Hz", id, lookup.hz),
                }
            }
        }
        Commands::Chords { octave } => {
            println!("Chords:");
            for chord in Chord::book() {
                let notes: Vec<String> = chord
                    .voicing(octave)
                    .iter()
                    .map(|note| note.to_string())
                    .collect();
                println!("- {}: {}", chord, notes.join(" "));
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            notes,
            config,
            device,
        } => {
            let mut engine = init_engine(config, device)?;
            for id in notes.iter() {
                engine.play(id)?;
            }
            run_until_idle(engine).await;
        }
        Commands::Chord {
            name,
            config,
            device,
        } => {
            let mut engine = init_engine(config, device)?;
            if !engine.is_available() {
                return Err("no audio device available".into());
            }
            let chord = engine.play_named_chord(&name)?;
            println!("{}: {}", name, chord.notes().join(" "));
            run_until_idle(engine).await;
        }
        Commands::Start { config, device } => {
            let engine = init_engine(config, device)?;

            println!("Keys:");
            for (key, pitch) in KeyMap::default().bindings() {
                println!("- {}: {}", key, pitch);
            }

            let mut controller = Controller::new(engine, Arc::new(keyboard::Driver::new()));
            controller.join().await?;
        }
    }

    Ok(())
}
