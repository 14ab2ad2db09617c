//! Sample and audio format descriptors.
//!
//! A [`SampleFormat`] describes how one frame of audio is laid out in
//! memory: bit depth, byte order and interleaved channel count. An
//! [`AudioFormat`] adds the sample rate and caches the derived byte-rate
//! quantities the streaming engine needs every tick.
//!
//! Both types are immutable once constructed; all the invariant checking
//! happens in the constructors, so every accessor is a plain read.
//!
//! # Example
//!
//! ```
//! use chirp::{AudioFormat, SampleFormat};
//!
//! let format = AudioFormat::new(44_100, SampleFormat::SIXTEEN_BIT_LE_STEREO).unwrap();
//! assert_eq!(format.bytes_per_frame(), 4);
//! assert_eq!(format.bytes_per_second(), 176_400);
//! ```

use core::time::Duration;

use crate::error::{Error, Result};

/// Byte order of a multi-byte sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Memory layout of a single frame of samples.
///
/// A frame is one sample per channel, interleaved. Byte order only exists
/// for samples wider than one byte, and the constructors enforce that
/// relationship: [`SampleFormat::new`] for single-byte samples,
/// [`SampleFormat::with_byte_order`] for anything wider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleFormat {
    bits_per_sample: u8,
    /// Meaningless (and unreachable through the API) when
    /// `bits_per_sample <= 8`.
    byte_order: ByteOrder,
    channels: u8,
    bytes_per_frame: u32,
}

impl SampleFormat {
    /// 8-bit mono.
    pub const EIGHT_BIT_MONO: SampleFormat = SampleFormat::raw(8, ByteOrder::LittleEndian, 1);
    /// 8-bit stereo.
    pub const EIGHT_BIT_STEREO: SampleFormat = SampleFormat::raw(8, ByteOrder::LittleEndian, 2);
    /// 16-bit little-endian mono.
    pub const SIXTEEN_BIT_LE_MONO: SampleFormat = SampleFormat::raw(16, ByteOrder::LittleEndian, 1);
    /// 16-bit big-endian mono.
    pub const SIXTEEN_BIT_BE_MONO: SampleFormat = SampleFormat::raw(16, ByteOrder::BigEndian, 1);
    /// 16-bit little-endian stereo.
    pub const SIXTEEN_BIT_LE_STEREO: SampleFormat = SampleFormat::raw(16, ByteOrder::LittleEndian, 2);
    /// 16-bit big-endian stereo.
    pub const SIXTEEN_BIT_BE_STEREO: SampleFormat = SampleFormat::raw(16, ByteOrder::BigEndian, 2);

    const fn raw(bits_per_sample: u8, byte_order: ByteOrder, channels: u8) -> SampleFormat {
        SampleFormat {
            bits_per_sample,
            byte_order,
            channels,
            bytes_per_frame: (bits_per_sample as u32 / 8) * channels as u32,
        }
    }

    /// Create a sample format with at most eight bits per sample.
    ///
    /// Single-byte samples have no byte order; use
    /// [`with_byte_order`](Self::with_byte_order) for wider samples.
    pub fn new(bits_per_sample: u8, channels: u8) -> Result<SampleFormat> {
        if bits_per_sample > 8 {
            return Err(Error::FormatInvariant(
                "samples wider than one byte require an explicit byte order",
            ));
        }
        Self::validate(bits_per_sample, channels)?;
        Ok(Self::raw(bits_per_sample, ByteOrder::LittleEndian, channels))
    }

    /// Create a sample format with more than eight bits per sample.
    pub fn with_byte_order(
        bits_per_sample: u8,
        byte_order: ByteOrder,
        channels: u8,
    ) -> Result<SampleFormat> {
        if bits_per_sample <= 8 {
            return Err(Error::FormatInvariant(
                "byte order does not apply to single-byte samples",
            ));
        }
        Self::validate(bits_per_sample, channels)?;
        Ok(Self::raw(bits_per_sample, byte_order, channels))
    }

    fn validate(bits_per_sample: u8, channels: u8) -> Result<()> {
        if bits_per_sample < 8 || bits_per_sample > 32 {
            return Err(Error::FormatInvariant("bits per sample must be within 8..=32"));
        }
        if channels == 0 {
            return Err(Error::FormatInvariant("at least one channel is required"));
        }
        Ok(())
    }

    /// Number of bits in one sample.
    pub fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    /// Byte order of each sample.
    ///
    /// Fails with [`Error::InvalidOperation`] for single-byte samples,
    /// which have no byte order to report.
    pub fn byte_order(&self) -> Result<ByteOrder> {
        if self.bits_per_sample <= 8 {
            return Err(Error::InvalidOperation(
                "single-byte samples have no byte order",
            ));
        }
        Ok(self.byte_order)
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Number of bytes in one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> u32 {
        self.bytes_per_frame
    }
}

/// A sample format at a concrete sample rate.
///
/// Caches `bytes_per_second` and `duration_per_frame` at construction so
/// the per-tick arithmetic in the engine never recomputes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    sample_rate: u32,
    sample_format: SampleFormat,
    bytes_per_second: u32,
    duration_per_frame: Duration,
}

impl AudioFormat {
    /// Create an audio format from a sample rate and a sample format.
    ///
    /// The sample rate must be positive.
    pub fn new(sample_rate: u32, sample_format: SampleFormat) -> Result<AudioFormat> {
        if sample_rate == 0 {
            return Err(Error::FormatInvariant("sample rate must be positive"));
        }
        Ok(AudioFormat {
            sample_rate,
            sample_format,
            bytes_per_second: sample_format.bytes_per_frame() * sample_rate,
            duration_per_frame: Duration::from_nanos(1_000_000_000 / sample_rate as u64),
        })
    }

    /// The sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The underlying sample format.
    pub fn sample_format(&self) -> &SampleFormat {
        &self.sample_format
    }

    pub fn bits_per_sample(&self) -> u8 {
        self.sample_format.bits_per_sample()
    }

    pub fn channels(&self) -> u8 {
        self.sample_format.channels()
    }

    pub fn byte_order(&self) -> Result<ByteOrder> {
        self.sample_format.byte_order()
    }

    pub fn bytes_per_frame(&self) -> u32 {
        self.sample_format.bytes_per_frame()
    }

    /// Number of bytes that one second of audio occupies.
    pub fn bytes_per_second(&self) -> u32 {
        self.bytes_per_second
    }

    /// Time covered by a single frame.
    pub fn duration_per_frame(&self) -> Duration {
        self.duration_per_frame
    }

    /// Number of bytes covering `duration` of audio, truncated.
    pub fn byte_count_for(&self, duration: Duration) -> u32 {
        ((duration.as_micros() * self.bytes_per_second as u128) / 1_000_000) as u32
    }

    /// Playback time covered by `byte_count` bytes, in whole microseconds.
    pub fn duration_of(&self, byte_count: u32) -> Duration {
        Duration::from_micros((byte_count as u64 * 1_000_000) / self.bytes_per_second as u64)
    }
}
