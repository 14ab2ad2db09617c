//! Cross-platform audio output with a cursor-chasing streaming engine.
//!
//! chirp lets you enumerate output devices and stream continuously
//! generated samples to one of them with low latency. Each stream owns a
//! hardware ring buffer; a per-device clock thread ticks the streaming
//! engine, which chases the hardware cursors and asks your sample
//! provider for just enough bytes to stay inside the write-ahead limit.
//!
//! # Quick start
//!
//! ```no_run
//! use std::f32::consts::TAU;
//! use chirp::{AudioFormat, AudioPlatform, SampleFormat};
//!
//! let platform = AudioPlatform::new().expect("no audio backend");
//! let device = platform.default_output_device().expect("no output device");
//!
//! let format = AudioFormat::new(44_100, SampleFormat::SIXTEEN_BIT_LE_STEREO).unwrap();
//! let stream = device.create_stream(format);
//!
//! stream.play_async(move |elapsed, mut request| {
//!     let rate = request.format().sample_rate() as f32;
//!     let mut t = elapsed.as_secs_f32();
//!     for frame in request.frames_mut() {
//!         let value = ((TAU * 440.0 * t).sin() * 0.25 * i16::MAX as f32) as i16;
//!         let bytes = value.to_le_bytes();
//!         frame[..2].copy_from_slice(&bytes);
//!         frame[2..].copy_from_slice(&bytes);
//!         t += 1.0 / rate;
//!     }
//! }).unwrap();
//!
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! stream.stop();
//! ```
//!
//! # Architecture
//!
//! - [`AudioPlatform`] selects a [`backend`] at startup and enumerates
//!   [`OutputDevice`]s
//! - [`AudioStream`] owns one ring buffer and the tick logic that fills it
//! - [`UpdateClock`](clock::UpdateClock) drives all streams of one device
//!   from a single background thread
//!
//! Backends implement the object-safe traits in [`backend`]; the engine
//! never knows which platform API it is talking to.

pub mod backend;
pub mod clock;
mod device;
mod error;
mod format;
mod platform;
mod request;
mod stream;

pub use device::OutputDevice;
pub use error::{BackendError, Error, Result};
pub use format::{AudioFormat, ByteOrder, SampleFormat};
pub use platform::{AudioPlatform, BackendId};
pub use request::SampleRequest;
pub use stream::{AudioStream, SampleProvider, StreamConfig, StreamState};
