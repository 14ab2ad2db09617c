//! Error types for the chirp library.

use thiserror::Error;

use crate::stream::StreamState;

/// Errors surfaced by backend implementations.
///
/// Backends wrap whatever their platform API reports into one of these
/// variants. The streaming engine treats them uniformly: construction-time
/// failures surface to the caller, tick-time failures become a state
/// transition (see [`AudioStream`](crate::AudioStream)).
#[derive(Debug, Error)]
pub enum BackendError {
    /// No output device is available.
    #[error("no output device available")]
    NoDevice,

    /// The device refused to create or operate a stream buffer.
    #[error("device error: {0}")]
    Device(String),

    /// The backend cannot represent the requested audio format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A lock request fell outside the ring buffer.
    #[error("lock of {length} bytes at offset {offset} exceeds buffer of {capacity} bytes")]
    OutOfRange {
        offset: u32,
        length: u32,
        capacity: u32,
    },

    /// The hardware buffer was lost and could not be restored.
    #[error("buffer lost and unrestorable")]
    BufferLost,
}

/// Errors surfaced by the chirp public API.
#[derive(Debug, Error)]
pub enum Error {
    /// A format constructor was given arguments that violate the
    /// byte-order/bit-depth relationship, or degenerate values.
    #[error("invalid format: {0}")]
    FormatInvariant(&'static str),

    /// A query that does not apply to the value it was asked of, such as
    /// the byte order of a single-byte sample format.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// An operation required the stream to be in a different state.
    #[error("stream is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: StreamState,
        actual: StreamState,
    },

    /// The requested backend is not compiled into this build.
    #[error("unknown backend `{0}`")]
    UnknownBackend(&'static str),

    /// No backend is compiled into this build at all.
    #[error("no default backend available")]
    NoDefaultBackend,

    /// The platform has no default output device.
    #[error("no default output device")]
    NoDefaultDevice,

    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
