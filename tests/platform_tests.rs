//! Platform construction, backend selection and device enumeration.

mod common;

use std::sync::Arc;

use chirp::{AudioPlatform, Error};
use common::TestBackend;

#[test]
fn platform_enumerates_backend_devices() {
    let (backend, _state) = TestBackend::single("Rear Speakers");
    let platform = AudioPlatform::from_backend(Arc::new(backend)).unwrap();

    assert_eq!(platform.backend_name(), "test");
    assert_eq!(platform.output_devices().len(), 1);
    assert_eq!(platform.output_devices()[0].name(), "Rear Speakers");
}

#[test]
fn default_device_is_shared_with_the_enumeration() {
    let (backend, _state) = TestBackend::single("Main Out");
    let platform = AudioPlatform::from_backend(Arc::new(backend)).unwrap();

    let default = platform.default_output_device().unwrap();
    assert_eq!(default.name(), "Main Out");
    // Looking it up twice yields the same underlying device object.
    assert_eq!(platform.output_devices().len(), 1);
}

#[test]
fn platform_without_devices_has_no_default() {
    let platform = AudioPlatform::from_backend(Arc::new(TestBackend::empty())).unwrap();

    assert!(platform.output_devices().is_empty());
    assert!(matches!(
        platform.default_output_device(),
        Err(Error::NoDefaultDevice)
    ));
}

#[cfg(not(feature = "cpal_backend"))]
#[test]
fn requesting_a_backend_that_is_not_compiled_in_fails() {
    assert!(matches!(
        AudioPlatform::with_backend(chirp::BackendId::Cpal),
        Err(Error::UnknownBackend("cpal"))
    ));
}

#[cfg(not(feature = "cpal_backend"))]
#[test]
fn platform_default_requires_a_compiled_backend() {
    assert!(matches!(
        AudioPlatform::with_backend(chirp::BackendId::PlatformDefault),
        Err(Error::NoDefaultBackend)
    ));
}
