//! Backend interface traits.
//!
//! A backend bridges the streaming engine to a platform audio API. The
//! traits are object-safe on purpose: backends are selected at runtime by
//! [`AudioPlatform`](crate::AudioPlatform), and the engine only ever talks
//! to `dyn` objects.
//!
//! The split mirrors the three lifetimes involved:
//!
//! - [`Backend`] - the platform API itself; enumerates devices
//! - [`DeviceBackend`] - one output device; opens stream buffers
//! - [`StreamBuffer`] - one hardware ring buffer; locked, written and
//!   played by exactly one [`AudioStream`](crate::AudioStream)

use core::time::Duration;
use std::sync::Arc;

use crate::error::BackendError;
use crate::format::AudioFormat;

#[cfg(feature = "cpal_backend")]
pub mod cpal;

/// Hardware cursor positions inside a ring buffer, in bytes.
///
/// `read` is how far playback has consumed; `play` marks the end of the
/// region the hardware is about to read, which is unsafe to overwrite.
/// Both wrap modulo the buffer capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursors {
    pub read: u32,
    pub play: u32,
}

/// A locked, writable range of a ring buffer.
///
/// A range that crosses the end of the ring comes back as two contiguous
/// spans; otherwise `second` is empty. Spans are plain slices so writes
/// are bounds-checked by construction.
#[derive(Debug)]
pub struct LockedRegion<'a> {
    pub first: &'a mut [u8],
    pub second: &'a mut [u8],
}

impl<'a> LockedRegion<'a> {
    /// Total locked byte count across both spans.
    pub fn byte_count(&self) -> u32 {
        (self.first.len() + self.second.len()) as u32
    }

    /// Consume the region, yielding the non-empty spans in ring order.
    pub fn into_spans(self) -> impl Iterator<Item = &'a mut [u8]> {
        core::iter::once(self.first)
            .chain(core::iter::once(self.second))
            .filter(|span| !span.is_empty())
    }
}

/// A platform audio API.
pub trait Backend: Send + Sync {
    /// Short identifier, e.g. `"cpal"`.
    fn name(&self) -> &'static str;

    /// All output devices the platform currently exposes.
    fn output_devices(&self) -> Result<Vec<Arc<dyn DeviceBackend>>, BackendError>;

    /// The platform's preferred output device.
    fn default_output_device(&self) -> Result<Arc<dyn DeviceBackend>, BackendError>;
}

/// One output device of a backend.
pub trait DeviceBackend: Send + Sync {
    /// Human-readable device name.
    fn name(&self) -> String;

    /// Allocate a hardware ring buffer holding `buffer_duration` worth of
    /// audio in `format`.
    ///
    /// The returned handle is exclusively owned by the stream that
    /// requested it. Failure here leaves the stream in the `Invalid`
    /// state; it is not retried.
    fn open_stream(
        &self,
        format: &AudioFormat,
        buffer_duration: Duration,
    ) -> Result<Box<dyn StreamBuffer>, BackendError>;
}

/// A hardware ring buffer and its transport controls.
///
/// All byte offsets wrap modulo [`capacity`](Self::capacity). The engine
/// serializes every call through its own mutex, so implementations never
/// see concurrent calls.
pub trait StreamBuffer: Send {
    /// Ring capacity in bytes.
    fn capacity(&self) -> u32;

    /// Lock `length` bytes starting at `offset` for writing.
    ///
    /// The spans stay valid until [`unlock`](Self::unlock) commits them;
    /// locking a range larger than the capacity is an error.
    fn lock(&mut self, offset: u32, length: u32) -> Result<LockedRegion<'_>, BackendError>;

    /// Commit a previously locked range back to the hardware.
    fn unlock(&mut self, offset: u32, length: u32) -> Result<(), BackendError>;

    /// Current hardware cursor positions.
    fn cursors(&mut self) -> Result<Cursors, BackendError>;

    /// Begin looping playback over the ring.
    fn play_looping(&mut self) -> Result<(), BackendError>;

    /// Halt playback. Cursors freeze until the next `play_looping`.
    fn stop(&mut self) -> Result<(), BackendError>;

    /// Whether the hardware invalidated the buffer contents (e.g. the OS
    /// took the device away).
    fn is_lost(&self) -> bool;

    /// Try to re-acquire a lost buffer.
    ///
    /// `Ok(true)` means the buffer is usable again (its contents are
    /// undefined - the caller re-fills it), `Ok(false)` means the loss
    /// persists and the call may be retried, `Err` means the buffer is
    /// gone for good.
    fn restore(&mut self) -> Result<bool, BackendError>;
}
