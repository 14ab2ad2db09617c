//! The streaming playback engine.
//!
//! An [`AudioStream`] owns one hardware ring buffer and keeps it topped up
//! with caller-generated samples while the hardware loops over it. The
//! filling happens on the device's [`UpdateClock`] thread: every tick the
//! engine chases the hardware read cursor, asks the sample provider for
//! just enough bytes to stay under the write-ahead limit, and commits them
//! back to the buffer.
//!
//! # Example
//!
//! ```no_run
//! use chirp::{AudioFormat, AudioPlatform, SampleFormat};
//!
//! let platform = AudioPlatform::new().unwrap();
//! let device = platform.default_output_device().unwrap();
//!
//! let format = AudioFormat::new(44_100, SampleFormat::SIXTEEN_BIT_LE_STEREO).unwrap();
//! let stream = device.create_stream(format);
//!
//! stream.play_async(move |elapsed, mut request| {
//!     let _ = elapsed; // phase-continuous generators key off this
//!     for frame in request.frames_mut() {
//!         // write one frame of interleaved samples
//!         frame.fill(0);
//!     }
//! }).unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::backend::{DeviceBackend, StreamBuffer};
use crate::clock::{Subscription, UpdateClock};
use crate::error::{BackendError, Error, Result};
use crate::format::AudioFormat;
use crate::request::SampleRequest;

/// Lifecycle state of an [`AudioStream`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// The hardware buffer could not be created, or failed beyond
    /// recovery. The stream produces silence until recreated.
    Invalid,
    /// The buffer is allocated and silent; the stream is not consuming
    /// clock ticks.
    Ready,
    /// Subscribed to the device clock and actively requesting samples.
    Playing,
}

/// Tuning knobs for a stream's ring buffer.
#[derive(Clone, Copy, Debug)]
pub struct StreamConfig {
    /// How much audio the ring buffer holds in total.
    pub buffer_duration: Duration,
    /// Ceiling on how far ahead of the read cursor the engine writes.
    /// Larger values survive longer stalls, smaller values react faster.
    pub write_ahead_limit: Duration,
}

impl Default for StreamConfig {
    fn default() -> StreamConfig {
        StreamConfig {
            buffer_duration: Duration::from_secs(2),
            write_ahead_limit: Duration::from_millis(500),
        }
    }
}

/// Caller-supplied callback that generates samples on demand.
///
/// Invoked with the cumulative play duration (for phase continuity) and a
/// zeroed [`SampleRequest`] to fill. Runs on the clock thread: keep it
/// fast, allocation-free and non-blocking or risk audible underruns.
pub type SampleProvider = Box<dyn FnMut(Duration, SampleRequest<'_>) + Send>;

/// Why a tick stopped early.
enum TickAbort {
    /// Transient trouble; try again on the next tick.
    Skip,
    /// Hardware refused a query; fall back to `Ready`.
    Halt,
    /// The buffer is gone for good.
    Invalidate,
}

struct Inner {
    format: AudioFormat,
    /// `None` only when buffer creation failed (state `Invalid`).
    buffer: Option<Box<dyn StreamBuffer>>,
    state: StreamState,
    provider: Option<SampleProvider>,
    subscription: Option<Subscription>,
    /// Next byte offset the engine writes at, modulo capacity.
    write_position: u32,
    /// Cumulative playback time handed to the provider.
    play_duration: Duration,
    capacity: u32,
    write_ahead_limit: u32,
}

impl Inner {
    fn creation_failed(format: AudioFormat) -> Inner {
        Inner {
            format,
            buffer: None,
            state: StreamState::Invalid,
            provider: None,
            subscription: None,
            write_position: 0,
            play_duration: Duration::ZERO,
            capacity: 0,
            write_ahead_limit: 0,
        }
    }

    /// One clock tick: recover, measure, fill, commit.
    fn tick(&mut self) {
        if self.state != StreamState::Playing {
            return;
        }
        match self.run_tick() {
            Ok(()) | Err(TickAbort::Skip) => {}
            Err(TickAbort::Halt) => self.halt(),
            Err(TickAbort::Invalidate) => self.invalidate(),
        }
    }

    fn run_tick(&mut self) -> core::result::Result<(), TickAbort> {
        let format = self.format;
        let capacity = self.capacity;
        let write_ahead_limit = self.write_ahead_limit;

        let Inner {
            buffer,
            provider,
            write_position,
            play_duration,
            ..
        } = self;
        let buffer = match buffer.as_mut() {
            Some(buffer) => buffer,
            None => return Err(TickAbort::Invalidate),
        };
        let provider = match provider.as_mut() {
            Some(provider) => provider,
            None => return Ok(()),
        };

        // Re-acquire a lost buffer before anything else. A loss that
        // persists is retried on the next tick; a refusal is final.
        if buffer.is_lost() {
            match buffer.restore() {
                Ok(true) => {
                    debug!("stream buffer restored, clearing");
                    clear_entire_buffer(buffer.as_mut()).map_err(|err| {
                        warn!(error = %err, "failed to clear restored buffer");
                        TickAbort::Invalidate
                    })?;
                }
                Ok(false) => return Err(TickAbort::Skip),
                Err(err) => {
                    warn!(error = %err, "stream buffer lost beyond recovery");
                    return Err(TickAbort::Invalidate);
                }
            }
        }

        let cursors = buffer.cursors().map_err(|err| {
            warn!(error = %err, "cursor query failed, halting playback");
            TickAbort::Halt
        })?;

        // Bytes written but not yet played. At or beyond the write-ahead
        // limit the buffer is full enough; skip the whole tick.
        let written_ahead = ring_distance(cursors.read, *write_position, capacity);
        if written_ahead >= write_ahead_limit {
            return Ok(());
        }

        // The hardware is about to read [read, play); everything else is
        // writable, capped by the write-ahead limit and clamped to whole
        // frames so the provider never sees a fractional frame.
        let unsafe_bytes = ring_distance(cursors.read, cursors.play, capacity);
        let mut byte_count = (capacity - unsafe_bytes).min(write_ahead_limit);
        byte_count -= byte_count % format.bytes_per_frame();
        if byte_count == 0 {
            return Ok(());
        }

        let from = *write_position;
        {
            let region = buffer.lock(from, byte_count).map_err(|err| {
                warn!(error = %err, "buffer lock failed");
                TickAbort::Skip
            })?;
            for span in region.into_spans() {
                let len = span.len() as u32;
                span.fill(0);
                provider(*play_duration, SampleRequest::new(span, &format));
                *play_duration += format.duration_of(len);
                *write_position = (*write_position + len) % capacity;
            }
        }
        buffer.unlock(from, byte_count).map_err(|err| {
            warn!(error = %err, "buffer unlock failed");
            TickAbort::Skip
        })?;
        Ok(())
    }

    /// Stop playback and return to `Ready`. Idempotent; an `Invalid`
    /// stream stays invalid.
    fn halt(&mut self) {
        if self.state != StreamState::Playing {
            return;
        }
        if let Some(buffer) = self.buffer.as_mut() {
            if let Err(err) = buffer.stop() {
                warn!(error = %err, "hardware stop failed");
            }
        }
        self.subscription = None;
        self.provider = None;
        self.state = StreamState::Ready;
        debug!("stream stopped");
    }

    fn invalidate(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            let _ = buffer.stop();
        }
        self.subscription = None;
        self.provider = None;
        self.state = StreamState::Invalid;
        debug!("stream invalidated");
    }
}

/// Circular distance from `from` forward to `to` in a ring of
/// `capacity` bytes. Handles wraparound in both operand orders.
fn ring_distance(from: u32, to: u32, capacity: u32) -> u32 {
    if to >= from {
        to - from
    } else {
        capacity - from + to
    }
}

fn clear_entire_buffer(
    buffer: &mut dyn StreamBuffer,
) -> core::result::Result<(), BackendError> {
    let capacity = buffer.capacity();
    {
        let region = buffer.lock(0, capacity)?;
        for span in region.into_spans() {
            span.fill(0);
        }
    }
    buffer.unlock(0, capacity)
}

/// A stream of audio playing to one output device.
///
/// Created by [`OutputDevice::create_stream`](crate::OutputDevice::create_stream).
/// The stream exclusively owns its hardware ring buffer; the sample
/// provider is owned by the caller and merely invoked by the engine.
///
/// Dropping the stream stops playback on every exit path.
pub struct AudioStream {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<UpdateClock>,
    format: AudioFormat,
}

impl AudioStream {
    pub(crate) fn open(
        device: &dyn DeviceBackend,
        clock: Arc<UpdateClock>,
        format: AudioFormat,
        config: StreamConfig,
    ) -> AudioStream {
        let inner = match device.open_stream(&format, config.buffer_duration) {
            Ok(mut buffer) => {
                let capacity = buffer.capacity();
                match clear_entire_buffer(buffer.as_mut()) {
                    Ok(()) => Inner {
                        format,
                        buffer: Some(buffer),
                        state: StreamState::Ready,
                        provider: None,
                        subscription: None,
                        write_position: 0,
                        play_duration: Duration::ZERO,
                        capacity,
                        write_ahead_limit: format.byte_count_for(config.write_ahead_limit),
                    },
                    Err(err) => {
                        error!(error = %err, "could not clear new stream buffer");
                        Inner::creation_failed(format)
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "could not create stream buffer");
                Inner::creation_failed(format)
            }
        };
        AudioStream {
            inner: Arc::new(Mutex::new(inner)),
            clock,
            format,
        }
    }

    /// Begin asynchronous playback.
    ///
    /// `provider` is invoked on the device clock thread, zero or more
    /// times per tick, to fill buffer segments; see [`SampleProvider`]
    /// for its obligations. Requires state [`StreamState::Ready`].
    ///
    /// On hardware rejection the stream transitions to
    /// [`StreamState::Invalid`] and the error is returned.
    pub fn play_async<F>(&self, provider: F) -> Result<()>
    where
        F: FnMut(Duration, SampleRequest<'_>) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.state != StreamState::Ready {
            return Err(Error::InvalidState {
                expected: StreamState::Ready,
                actual: inner.state,
            });
        }

        inner.provider = Some(Box::new(provider));
        let weak = Arc::downgrade(&self.inner);
        inner.subscription = Some(self.clock.subscribe(move |_delta| {
            if let Some(inner) = weak.upgrade() {
                inner.lock().tick();
            }
        }));

        let started = match inner.buffer.as_mut() {
            Some(buffer) => buffer.play_looping(),
            None => Err(BackendError::Device("stream buffer missing".into())),
        };
        match started {
            Ok(()) => {
                inner.state = StreamState::Playing;
                debug!("stream playing");
                Ok(())
            }
            Err(err) => {
                if let Some(buffer) = inner.buffer.as_mut() {
                    let _ = buffer.stop();
                }
                inner.subscription = None;
                inner.provider = None;
                inner.state = StreamState::Invalid;
                warn!(error = %err, "playback rejected by backend");
                Err(err.into())
            }
        }
    }

    /// Stop playback.
    ///
    /// Idempotent from any state. Blocks until any in-flight tick for
    /// this stream has completed; afterwards no further ticks fire.
    pub fn stop(&self) {
        self.inner.lock().halt();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.inner.lock().state
    }

    /// `true` only while the stream is playing.
    pub fn is_playing(&self) -> bool {
        self.state() == StreamState::Playing
    }

    /// The stream's audio format.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.stop();
    }
}
