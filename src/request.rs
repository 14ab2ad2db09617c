//! Sample requests handed to provider callbacks.

use core::slice::ChunksExactMut;
use core::time::Duration;

use crate::format::AudioFormat;

/// A request for samples to fill one contiguous buffer segment.
///
/// The engine constructs one of these for every locked span of the ring
/// buffer and hands it to the sample provider, together with the elapsed
/// play duration. The request borrows the target bytes and the stream's
/// [`AudioFormat`]; it is never stored and dies when the callback returns.
///
/// The target starts out zeroed, so a provider that writes nothing
/// produces silence.
#[derive(Debug)]
pub struct SampleRequest<'a> {
    buffer: &'a mut [u8],
    format: &'a AudioFormat,
}

impl<'a> SampleRequest<'a> {
    /// Wrap a buffer segment in a request.
    ///
    /// Normally the engine does this for every locked span; constructing
    /// one directly is useful for exercising a provider in tests.
    pub fn new(buffer: &'a mut [u8], format: &'a AudioFormat) -> SampleRequest<'a> {
        SampleRequest { buffer, format }
    }

    /// The target bytes to fill with interleaved sample data.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.buffer
    }

    /// Size of the target in bytes.
    pub fn byte_count(&self) -> u32 {
        self.buffer.len() as u32
    }

    /// The audio format the samples must be written in.
    pub fn format(&self) -> &AudioFormat {
        self.format
    }

    /// Number of whole frames that fit in the target.
    pub fn frames(&self) -> u32 {
        self.byte_count() / self.format.bytes_per_frame()
    }

    /// Iterate over the target one frame at a time.
    ///
    /// Each item is `bytes_per_frame` bytes long; a trailing partial frame
    /// (which the engine never produces) would be skipped.
    pub fn frames_mut(&mut self) -> ChunksExactMut<'_, u8> {
        let frame = self.format.bytes_per_frame() as usize;
        self.buffer.chunks_exact_mut(frame)
    }

    /// Playback time covered by the requested data.
    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.byte_count())
    }
}
