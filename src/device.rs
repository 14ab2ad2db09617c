//! Output devices.

use std::sync::Arc;

use crate::backend::DeviceBackend;
use crate::clock::UpdateClock;
use crate::format::AudioFormat;
use crate::stream::{AudioStream, StreamConfig};

/// An audio output device.
///
/// What a device corresponds to depends on the backend, but as far as
/// chirp is concerned it is something that can play streams. Every device
/// owns one [`UpdateClock`]; all streams created from it (or from clones
/// of it) share that clock thread.
#[derive(Clone)]
pub struct OutputDevice {
    backend: Arc<dyn DeviceBackend>,
    clock: Arc<UpdateClock>,
}

impl OutputDevice {
    pub(crate) fn new(backend: Arc<dyn DeviceBackend>, clock: Arc<UpdateClock>) -> OutputDevice {
        OutputDevice { backend, clock }
    }

    /// Human-readable device name.
    pub fn name(&self) -> String {
        self.backend.name()
    }

    /// Create a stream on this device with the default
    /// [`StreamConfig`].
    ///
    /// Inspect [`state`](AudioStream::state) to learn whether buffer
    /// creation succeeded; a failed stream reports
    /// [`StreamState::Invalid`](crate::StreamState::Invalid) and plays
    /// silence.
    pub fn create_stream(&self, format: AudioFormat) -> AudioStream {
        self.create_stream_with(format, StreamConfig::default())
    }

    /// Create a stream with explicit buffer tuning.
    pub fn create_stream_with(&self, format: AudioFormat, config: StreamConfig) -> AudioStream {
        AudioStream::open(
            self.backend.as_ref(),
            Arc::clone(&self.clock),
            format,
            config,
        )
    }
}
