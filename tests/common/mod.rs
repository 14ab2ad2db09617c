//! A scriptable in-memory backend for exercising the streaming engine
//! without real hardware.
//!
//! The test body keeps an `Arc<TestDeviceState>` and flips its knobs to
//! script failures, cursor movement and buffer loss; the engine sees an
//! ordinary backend.

// Each integration test binary compiles its own copy and uses a subset.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chirp::backend::{Backend, Cursors, DeviceBackend, LockedRegion, StreamBuffer};
use chirp::{AudioFormat, BackendError};

/// What `restore` should report next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreScript {
    Recovered,
    StillLost,
    Gone,
}

pub struct TestDeviceState {
    pub fail_creation: AtomicBool,
    pub fail_play: AtomicBool,
    pub fail_cursors: AtomicBool,
    pub lost: AtomicBool,
    pub restore_script: Mutex<RestoreScript>,
    /// Cursors the backend reports to the engine.
    pub cursors: Mutex<Cursors>,
    /// Committed ring contents, as the hardware would see them.
    pub ring: Mutex<Vec<u8>>,
    pub capacity: AtomicU32,
    pub lock_calls: AtomicUsize,
    pub unlock_calls: AtomicUsize,
    pub play_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

impl TestDeviceState {
    fn new() -> TestDeviceState {
        TestDeviceState {
            fail_creation: AtomicBool::new(false),
            fail_play: AtomicBool::new(false),
            fail_cursors: AtomicBool::new(false),
            lost: AtomicBool::new(false),
            restore_script: Mutex::new(RestoreScript::Recovered),
            cursors: Mutex::new(Cursors { read: 0, play: 0 }),
            ring: Mutex::new(Vec::new()),
            capacity: AtomicU32::new(0),
            lock_calls: AtomicUsize::new(0),
            unlock_calls: AtomicUsize::new(0),
            play_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_cursors(&self, read: u32, play: u32) {
        *self.cursors.lock().unwrap() = Cursors { read, play };
    }

    pub fn ring_snapshot(&self) -> Vec<u8> {
        self.ring.lock().unwrap().clone()
    }
}

pub struct TestDevice {
    name: String,
    pub state: Arc<TestDeviceState>,
}

impl DeviceBackend for TestDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn open_stream(
        &self,
        format: &AudioFormat,
        buffer_duration: Duration,
    ) -> Result<Box<dyn StreamBuffer>, BackendError> {
        if self.state.fail_creation.load(Ordering::Acquire) {
            return Err(BackendError::Device("creation refused by script".into()));
        }
        let capacity = format.byte_count_for(buffer_duration);
        self.state.capacity.store(capacity, Ordering::Release);
        *self.state.ring.lock().unwrap() = vec![0xAA; capacity as usize];
        Ok(Box::new(TestStreamBuffer {
            state: Arc::clone(&self.state),
            staging: vec![0u8; capacity as usize].into_boxed_slice(),
            capacity,
        }))
    }
}

struct TestStreamBuffer {
    state: Arc<TestDeviceState>,
    staging: Box<[u8]>,
    capacity: u32,
}

impl StreamBuffer for TestStreamBuffer {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn lock(&mut self, offset: u32, length: u32) -> Result<LockedRegion<'_>, BackendError> {
        if offset >= self.capacity || length > self.capacity {
            return Err(BackendError::OutOfRange {
                offset,
                length,
                capacity: self.capacity,
            });
        }
        self.state.lock_calls.fetch_add(1, Ordering::AcqRel);
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
        self.state.unlock_calls.fetch_add(1, Ordering::AcqRel);
        let offset = offset as usize;
        let length = length as usize;
        let first_len = length.min(self.staging.len() - offset);
        let wrapped = length - first_len;

        let mut ring = self.state.ring.lock().unwrap();
        ring[offset..offset + first_len]
            .copy_from_slice(&self.staging[offset..offset + first_len]);
        ring[..wrapped].copy_from_slice(&self.staging[..wrapped]);
        Ok(())
    }

    fn cursors(&mut self) -> Result<Cursors, BackendError> {
        if self.state.fail_cursors.load(Ordering::Acquire) {
            return Err(BackendError::Device("cursor query refused by script".into()));
        }
        Ok(*self.state.cursors.lock().unwrap())
    }

    fn play_looping(&mut self) -> Result<(), BackendError> {
        self.state.play_calls.fetch_add(1, Ordering::AcqRel);
        if self.state.fail_play.load(Ordering::Acquire) {
            return Err(BackendError::Device("playback refused by script".into()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.state.stop_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn is_lost(&self) -> bool {
        self.state.lost.load(Ordering::Acquire)
    }

    fn restore(&mut self) -> Result<bool, BackendError> {
        match *self.state.restore_script.lock().unwrap() {
            RestoreScript::Recovered => {
                self.state.lost.store(false, Ordering::Release);
                Ok(true)
            }
            RestoreScript::StillLost => Ok(false),
            RestoreScript::Gone => Err(BackendError::BufferLost),
        }
    }
}

pub struct TestBackend {
    devices: Vec<Arc<TestDevice>>,
    default_index: Option<usize>,
}

impl TestBackend {
    /// A backend with one output device named `device_name`.
    pub fn single(device_name: &str) -> (TestBackend, Arc<TestDeviceState>) {
        let state = Arc::new(TestDeviceState::new());
        let device = Arc::new(TestDevice {
            name: device_name.to_owned(),
            state: Arc::clone(&state),
        });
        (
            TestBackend {
                devices: vec![device],
                default_index: Some(0),
            },
            state,
        )
    }

    /// A backend that exposes no devices at all.
    pub fn empty() -> TestBackend {
        TestBackend {
            devices: Vec::new(),
            default_index: None,
        }
    }
}

impl Backend for TestBackend {
    fn name(&self) -> &'static str {
        "test"
    }

    fn output_devices(&self) -> Result<Vec<Arc<dyn DeviceBackend>>, BackendError> {
        Ok(self
            .devices
            .iter()
            .map(|device| Arc::clone(device) as Arc<dyn DeviceBackend>)
            .collect())
    }

    fn default_output_device(&self) -> Result<Arc<dyn DeviceBackend>, BackendError> {
        self.default_index
            .and_then(|index| self.devices.get(index))
            .map(|device| Arc::clone(device) as Arc<dyn DeviceBackend>)
            .ok_or(BackendError::NoDevice)
    }
}
