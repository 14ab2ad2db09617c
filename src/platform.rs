//! Backend selection and device enumeration.
//!
//! [`AudioPlatform`] is the entry point of the library: it picks a backend
//! implementation at startup, enumerates that backend's output devices
//! once, and hands out [`OutputDevice`] values that share per-device
//! update clocks.

use std::sync::Arc;

use crate::backend::Backend;
use crate::clock::{UpdateClock, DEFAULT_UPDATE_INTERVAL};
use crate::device::OutputDevice;
use crate::error::{Error, Result};

/// Which backend implementation to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendId {
    /// The default implementation for the current platform.
    PlatformDefault,
    /// The cpal backend (feature `cpal_backend`).
    Cpal,
}

/// The audio platform: a selected backend plus its device list.
///
/// Devices (and therefore their clocks) are enumerated once at
/// construction; repeated queries return the same shared device objects,
/// so two streams created through separate lookups of the same device
/// still tick on one clock thread.
pub struct AudioPlatform {
    backend: Arc<dyn Backend>,
    devices: Vec<OutputDevice>,
    default_index: Option<usize>,
}

impl AudioPlatform {
    /// Create a platform with the default backend.
    pub fn new() -> Result<AudioPlatform> {
        Self::with_backend(BackendId::PlatformDefault)
    }

    /// Create a platform with the requested backend.
    ///
    /// Fails with [`Error::UnknownBackend`] when the backend is not
    /// compiled into this build, or [`Error::NoDefaultBackend`] when no
    /// backend is available at all.
    pub fn with_backend(id: BackendId) -> Result<AudioPlatform> {
        Self::from_backend(create_backend(id)?)
    }

    /// Create a platform over a caller-supplied backend implementation.
    ///
    /// This is how custom or test backends enter the library.
    pub fn from_backend(backend: Arc<dyn Backend>) -> Result<AudioPlatform> {
        let backends = backend.output_devices()?;
        let mut devices: Vec<OutputDevice> = backends
            .iter()
            .map(|device| {
                OutputDevice::new(
                    Arc::clone(device),
                    Arc::new(UpdateClock::new(DEFAULT_UPDATE_INTERVAL)),
                )
            })
            .collect();

        let default_index = match backend.default_output_device() {
            Ok(default) => {
                match backends.iter().position(|b| Arc::ptr_eq(b, &default)) {
                    Some(index) => Some(index),
                    None => {
                        // Backend reported a default that enumeration
                        // missed; give it its own clock and keep it.
                        devices.push(OutputDevice::new(
                            default,
                            Arc::new(UpdateClock::new(DEFAULT_UPDATE_INTERVAL)),
                        ));
                        Some(devices.len() - 1)
                    }
                }
            }
            Err(_) => None,
        };

        Ok(AudioPlatform {
            backend,
            devices,
            default_index,
        })
    }

    /// Name of the selected backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// All output devices found at construction.
    pub fn output_devices(&self) -> &[OutputDevice] {
        &self.devices
    }

    /// The platform's preferred output device.
    pub fn default_output_device(&self) -> Result<OutputDevice> {
        self.default_index
            .and_then(|index| self.devices.get(index))
            .cloned()
            .ok_or(Error::NoDefaultDevice)
    }
}

fn create_backend(id: BackendId) -> Result<Arc<dyn Backend>> {
    match id {
        BackendId::PlatformDefault => default_backend(),
        #[cfg(feature = "cpal_backend")]
        BackendId::Cpal => Ok(Arc::new(crate::backend::cpal::CpalBackend::new()?)),
        #[cfg(not(feature = "cpal_backend"))]
        BackendId::Cpal => Err(Error::UnknownBackend("cpal")),
    }
}

#[cfg(feature = "cpal_backend")]
fn default_backend() -> Result<Arc<dyn Backend>> {
    Ok(Arc::new(crate::backend::cpal::CpalBackend::new()?))
}

#[cfg(not(feature = "cpal_backend"))]
fn default_backend() -> Result<Arc<dyn Backend>> {
    Err(Error::NoDefaultBackend)
}
