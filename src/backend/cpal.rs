//! cpal backend.
//!
//! Implements the backend traits on top of [cpal](https://docs.rs/cpal),
//! which covers ALSA, CoreAudio, WASAPI and friends. cpal is pull-based
//! (the OS invokes a callback that wants samples *now*) while the engine
//! is push-based (it writes ahead into a ring), so the bridge is a ring
//! buffer of raw bytes:
//!
//! - the engine locks and commits byte ranges through [`CpalStreamBuffer`]
//! - the cpal output callback loops over the committed bytes at the
//!   hardware rate, decoding them into the stream's sample type and
//!   advancing the play position; on underrun it simply replays stale
//!   bytes, exactly like a looping hardware buffer would
//!
//! cpal streams are not `Send`, so each stream lives on a small host
//! thread that parks after starting it and drops it on shutdown.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::error;

use crate::backend::{Backend, Cursors, DeviceBackend, LockedRegion, StreamBuffer};
use crate::error::BackendError;
use crate::format::{AudioFormat, ByteOrder};

/// How far the reported play cursor leads the read cursor, approximating
/// the span the hardware has already committed to reading.
const WRITE_LEAD: Duration = Duration::from_millis(15);

/// Backend over the platform's default cpal host.
///
/// Devices are enumerated once at construction, so repeated queries hand
/// out the same device objects.
pub struct CpalBackend {
    devices: Vec<Arc<dyn DeviceBackend>>,
    default_index: Option<usize>,
}

impl CpalBackend {
    pub fn new() -> Result<CpalBackend, BackendError> {
        let host = cpal::default_host();
        let default_name = host.default_output_device().and_then(|device| device.name().ok());

        let enumerated = host
            .output_devices()
            .map_err(|err| BackendError::Device(err.to_string()))?;
        let mut devices: Vec<Arc<dyn DeviceBackend>> = Vec::new();
        for device in enumerated {
            let name = device.name().unwrap_or_else(|_| "Unknown".into());
            devices.push(Arc::new(CpalOutputDevice { device, name }));
        }

        let default_index =
            default_name.and_then(|name| devices.iter().position(|device| device.name() == name));
        Ok(CpalBackend {
            devices,
            default_index,
        })
    }
}

impl Backend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn output_devices(&self) -> Result<Vec<Arc<dyn DeviceBackend>>, BackendError> {
        Ok(self.devices.clone())
    }

    fn default_output_device(&self) -> Result<Arc<dyn DeviceBackend>, BackendError> {
        self.default_index
            .and_then(|index| self.devices.get(index))
            .cloned()
            .ok_or(BackendError::NoDevice)
    }
}

struct CpalOutputDevice {
    device: cpal::Device,
    name: String,
}

impl DeviceBackend for CpalOutputDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn open_stream(
        &self,
        format: &AudioFormat,
        buffer_duration: Duration,
    ) -> Result<Box<dyn StreamBuffer>, BackendError> {
        let frame = format.bytes_per_frame();
        let mut capacity = format.byte_count_for(buffer_duration);
        capacity -= capacity % frame;
        if capacity == 0 {
            return Err(BackendError::UnsupportedFormat(
                "buffer duration shorter than one frame".into(),
            ));
        }

        let mut write_lead = format.byte_count_for(WRITE_LEAD).max(frame);
        write_lead -= write_lead % frame;

        let shared = Arc::new(RingShared {
            bytes: Mutex::new(vec![0u8; capacity as usize].into_boxed_slice()),
            play_pos: AtomicU32::new(0),
            playing: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        });

        let stream_config = cpal::StreamConfig {
            channels: format.channels() as cpal::ChannelCount,
            sample_rate: cpal::SampleRate(format.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };

        // The cpal stream is not Send; build and own it on a host thread
        // that parks after reporting back and exits when the stream
        // buffer drops its end of the shutdown channel.
        let device = self.device.clone();
        let fmt = *format;
        let host_shared = Arc::clone(&shared);
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let host = std::thread::Builder::new()
            .name("chirp-cpal-stream".into())
            .spawn(move || {
                let stream = match build_ring_stream(&device, &stream_config, &fmt, host_shared) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let started = stream
                    .play()
                    .map_err(|err| BackendError::Device(err.to_string()));
                let ok = started.is_ok();
                let _ = ready_tx.send(started);
                if ok {
                    let _ = shutdown_rx.recv();
                }
            })
            .map_err(|err| BackendError::Device(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = host.join();
                return Err(err);
            }
            Err(_) => {
                let _ = host.join();
                return Err(BackendError::Device("stream host thread died".into()));
            }
        }

        Ok(Box::new(CpalStreamBuffer {
            shared,
            staging: vec![0u8; capacity as usize].into_boxed_slice(),
            capacity,
            write_lead,
            shutdown: Some(shutdown_tx),
            host: Some(host),
        }))
    }
}

/// Ring state shared between the stream buffer and the audio callback.
struct RingShared {
    bytes: Mutex<Box<[u8]>>,
    /// Bytes consumed by the callback, modulo capacity.
    play_pos: AtomicU32,
    playing: AtomicBool,
    failed: AtomicBool,
}

/// The engine-facing ring buffer handle.
///
/// Writes go into an engine-side staging copy; `unlock` commits the
/// range into the shared ring under a short mutex hold (a memcpy), which
/// is the only point the engine and the audio callback contend.
struct CpalStreamBuffer {
    shared: Arc<RingShared>,
    staging: Box<[u8]>,
    capacity: u32,
    write_lead: u32,
    shutdown: Option<Sender<()>>,
    host: Option<JoinHandle<()>>,
}

impl CpalStreamBuffer {
    fn check_range(&self, offset: u32, length: u32) -> Result<(), BackendError> {
        if offset >= self.capacity || length > self.capacity {
            return Err(BackendError::OutOfRange {
                offset,
                length,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl StreamBuffer for CpalStreamBuffer {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn lock(&mut self, offset: u32, length: u32) -> Result<LockedRegion<'_>, BackendError> {
        self.check_range(offset, length)?;
        let offset = offset as usize;
        let length = length as usize;
        let first_len = length.min(self.staging.len() - offset);

        let (head, tail) = self.staging.split_at_mut(offset);
        Ok(LockedRegion {
            first: &mut tail[..first_len],
            second: &mut head[..length - first_len],
        })
    }

    fn unlock(&mut self, offset: u32, length: u32) -> Result<(), BackendError> {
        self.check_range(offset, length)?;
        let offset = offset as usize;
        let length = length as usize;
        let first_len = length.min(self.staging.len() - offset);
        let wrapped = length - first_len;

        let mut ring = self.shared.bytes.lock();
        ring[offset..offset + first_len].copy_from_slice(&self.staging[offset..offset + first_len]);
        ring[..wrapped].copy_from_slice(&self.staging[..wrapped]);
        Ok(())
    }

    fn cursors(&mut self) -> Result<Cursors, BackendError> {
        if self.shared.failed.load(Ordering::Acquire) {
            return Err(BackendError::Device("output stream failed".into()));
        }
        let read = self.shared.play_pos.load(Ordering::Acquire);
        let play = (read + self.write_lead) % self.capacity;
        Ok(Cursors { read, play })
    }

    fn play_looping(&mut self) -> Result<(), BackendError> {
        if self.shared.failed.load(Ordering::Acquire) {
            return Err(BackendError::Device("output stream failed".into()));
        }
        self.shared.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.shared.playing.store(false, Ordering::Release);
        Ok(())
    }

    fn is_lost(&self) -> bool {
        self.shared.failed.load(Ordering::Acquire)
    }

    fn restore(&mut self) -> Result<bool, BackendError> {
        // A failed cpal stream does not come back.
        Err(BackendError::BufferLost)
    }
}

impl Drop for CpalStreamBuffer {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(host) = self.host.take() {
            let _ = host.join();
        }
    }
}

fn build_ring_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: &AudioFormat,
    shared: Arc<RingShared>,
) -> Result<cpal::Stream, BackendError> {
    match format.bits_per_sample() {
        8 => build_stream::<u8>(device, config, shared, 1, |raw| raw[0]),
        16 => match format.byte_order().ok() {
            Some(ByteOrder::LittleEndian) => build_stream::<i16>(device, config, shared, 2, |raw| {
                i16::from_le_bytes([raw[0], raw[1]])
            }),
            _ => build_stream::<i16>(device, config, shared, 2, |raw| {
                i16::from_be_bytes([raw[0], raw[1]])
            }),
        },
        32 => match format.byte_order().ok() {
            Some(ByteOrder::LittleEndian) => {
                build_stream::<i32>(device, config, shared, 4, i32::from_le_bytes)
            }
            _ => build_stream::<i32>(device, config, shared, 4, i32::from_be_bytes),
        },
        bits => Err(BackendError::UnsupportedFormat(format!(
            "{} bits per sample",
            bits
        ))),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<RingShared>,
    width: usize,
    decode: impl Fn([u8; 4]) -> T + Send + 'static,
) -> Result<cpal::Stream, BackendError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let err_shared = Arc::clone(&shared);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                if !shared.playing.load(Ordering::Acquire) {
                    for sample in data.iter_mut() {
                        *sample = T::EQUILIBRIUM;
                    }
                    return;
                }
                let ring = shared.bytes.lock();
                let capacity = ring.len();
                let mut pos = shared.play_pos.load(Ordering::Relaxed) as usize;
                for sample in data.iter_mut() {
                    let mut raw = [0u8; 4];
                    for (i, byte) in raw.iter_mut().take(width).enumerate() {
                        *byte = ring[(pos + i) % capacity];
                    }
                    pos = (pos + width) % capacity;
                    *sample = decode(raw);
                }
                shared.play_pos.store(pos as u32, Ordering::Release);
            },
            move |err| {
                error!(error = %err, "cpal output stream error");
                err_shared.failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|err| BackendError::Device(err.to_string()))
}
