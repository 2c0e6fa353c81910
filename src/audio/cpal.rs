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
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, Sample, SizedSample,
};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, span, Level};

use super::synth::{Mixer, Voice, VoiceControl};
use super::{Device as AudioDevice, Tone as AudioTone, ToneSpec, DEFAULT_DEVICE};
use crate::{config, playsync::CancelHandle};

/// Global counter for tone IDs.
static TONE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A small wrapper around a cpal::Device. Once opened, it owns a running output
/// stream that mixes every tone started on it.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The running output stream. Only present for opened devices.
    output: Option<OutputManager>,
}

/// Owns the thread that keeps the cpal stream alive.
struct OutputManager {
    /// New voices are handed to the audio callback through here.
    voice_tx: Sender<Voice>,
    /// The sample rate the stream was opened with.
    sample_rate: u32,
    /// Cancelled when the stream should shut down.
    shutdown: CancelHandle,
    output_thread: Option<thread::JoinHandle<()>>,
}

impl OutputManager {
    /// Opens the stream on its own thread and waits for it to report that it's playing.
    fn start(device: cpal::Device, sample_rate: Option<u32>) -> Result<OutputManager, Box<dyn Error>> {
        let default_config = device.default_output_config()?;
        let sample_format = default_config.sample_format();
        let mut stream_config = default_config.config();
        if let Some(sample_rate) = sample_rate {
            stream_config.sample_rate = cpal::SampleRate(sample_rate);
        }
        let sample_rate = stream_config.sample_rate.0;

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded::<Voice>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        let shutdown = CancelHandle::new();

        let output_thread = {
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                let stream_result = match sample_format {
                    cpal::SampleFormat::F32 => {
                        build_stream::<f32>(&device, &stream_config, voice_rx)
                    }
                    cpal::SampleFormat::F64 => {
                        build_stream::<f64>(&device, &stream_config, voice_rx)
                    }
                    cpal::SampleFormat::I16 => {
                        build_stream::<i16>(&device, &stream_config, voice_rx)
                    }
                    cpal::SampleFormat::I32 => {
                        build_stream::<i32>(&device, &stream_config, voice_rx)
                    }
                    cpal::SampleFormat::U16 => {
                        build_stream::<u16>(&device, &stream_config, voice_rx)
                    }
                    other => Err(format!("unsupported sample format {}", other)),
                };

                let stream = match stream_result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(format!("failed to start stream: {}", e)));
                    return;
                }
                info!(sample_rate, "Output stream started");
                let _ = ready_tx.send(Ok(()));

                // The stream lives until the device is dropped.
                shutdown.wait();
                info!("Output stream stopped");
            })
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(OutputManager {
                voice_tx,
                sample_rate,
                shutdown,
                output_thread: Some(output_thread),
            }),
            Ok(Err(e)) => {
                let _ = output_thread.join();
                Err(e.into())
            }
            Err(_) => {
                let _ = output_thread.join();
                Err("output thread exited before the stream started".into())
            }
        }
    }
}

impl Drop for OutputManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(output_thread) = self.output_thread.take() {
            let _ = output_thread.join();
        }
    }
}

/// Builds an output stream of sample type T that renders the mixer into each buffer.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice_rx: Receiver<Voice>,
) -> Result<cpal::Stream, String>
where
    T: SizedSample + FromSample<f32>,
{
    let mut mixer = Mixer::new(config.channels);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                while let Ok(voice) = voice_rx.try_recv() {
                    mixer.add(voice);
                }

                scratch.resize(data.len(), 0.0);
                mixer.render(&mut scratch);
                for (dst, src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(*src);
                }
            },
            |err| error!(err = err.to_string(), "Output stream error"),
            None,
        )
        .map_err(|e| format!("failed to build stream: {}", e))
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal output devices without opening them.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                if let Some(found) = Device::describe(host_id, device) {
                    devices.push(found);
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Wraps a cpal device if it has at least one output channel.
    fn describe(host_id: cpal::HostId, device: cpal::Device) -> Option<Device> {
        let max_channels = device
            .supported_output_configs()
            .ok()?
            .map(|config| config.channels())
            .max()
            .unwrap_or(0);
        if max_channels == 0 {
            return None;
        }

        Some(Device {
            name: device.name().ok()?,
            max_channels,
            host_id,
            device,
            output: None,
        })
    }

    /// Opens the device named in the configuration and starts its output stream.
    /// "default" selects the default host's default output device.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        let name = config.device();
        let found = if name == DEFAULT_DEVICE {
            let host = cpal::default_host();
            host.default_output_device()
                .and_then(|device| Device::describe(host.id(), device))
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
        };

        match found {
            Some(mut device) => {
                device.output = Some(OutputManager::start(
                    device.device.clone(),
                    config.sample_rate(),
                )?);
                info!(device = device.to_string(), "Opened output device");
                Ok(device)
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }
}

impl AudioDevice for Device {
    fn start(&self, spec: ToneSpec) -> Result<Box<dyn AudioTone>, Box<dyn Error>> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| format!("device {} has not been opened", self.name))?;

        let id = TONE_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let (voice, control) = Voice::new(id, &spec, output.sample_rate);
        output
            .voice_tx
            .send(voice)
            .map_err(|_| format!("output stream for {} has stopped", self.name))?;

        Ok(Box::new(Tone { id, control }))
    }
}

/// A tone playing on the output stream.
struct Tone {
    id: u64,
    control: Arc<VoiceControl>,
}

impl AudioTone for Tone {
    fn id(&self) -> u64 {
        self.id
    }

    fn release(&self) {
        self.control.release();
    }

    fn is_finished(&self) -> bool {
        self.control.is_finished()
    }
}
