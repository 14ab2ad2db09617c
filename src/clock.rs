//! Per-device update clock.
//!
//! Every output device owns one [`UpdateClock`]: a background thread that
//! wakes at a fixed interval and fans the measured elapsed time out to
//! every subscribed stream. The clock knows nothing about audio - it is a
//! pure dispatcher that the streaming engine hangs its tick off of.
//!
//! Subscriptions are RAII handles. Dropping a [`Subscription`] removes the
//! callback synchronously, so a stream that has been stopped (or dropped,
//! or unwound by a panic) can never be ticked again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// Default wake-up interval of the clock thread.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(10);

type TickFn = Arc<dyn Fn(Duration) + Send + Sync>;

struct ClockShared {
    subscribers: Mutex<Vec<(u64, TickFn)>>,
    next_id: AtomicU64,
    abort: AtomicBool,
}

/// A periodic signal source driving the streams of one device.
///
/// The worker thread starts lazily on the first subscription and runs
/// until the clock is dropped. Each iteration sleeps the nominal
/// interval, then dispatches the *actual* elapsed time, so scheduler
/// jitter shows up in the deltas instead of silently accumulating.
pub struct UpdateClock {
    interval: Duration,
    shared: Arc<ClockShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateClock {
    /// Create a clock that fires every `interval`.
    pub fn new(interval: Duration) -> UpdateClock {
        UpdateClock {
            interval,
            shared: Arc::new(ClockShared {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                abort: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// The configured wake-up interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register `tick` to be called with the elapsed time on every clock
    /// wake-up, and make sure the worker thread is running.
    ///
    /// The callback runs on the clock thread and must not block; a slow
    /// callback delays every other stream on the device.
    pub fn subscribe(&self, tick: impl Fn(Duration) + Send + Sync + 'static) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.subscribers.lock().push((id, Arc::new(tick)));
        trace!(id, "clock subscriber added");
        self.ensure_worker_is_running();
        Subscription {
            id,
            shared: Arc::clone(&self.shared),
        }
    }

    fn ensure_worker_is_running(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        debug!(?interval, "starting update clock worker");
        *worker = Some(std::thread::spawn(move || {
            let mut last_update = Instant::now();
            while !shared.abort.load(Ordering::Acquire) {
                std::thread::sleep(interval);
                let now = Instant::now();
                let delta = now - last_update;
                last_update = now;

                // Snapshot under the lock, dispatch outside of it, so a
                // subscriber dropping its Subscription mid-tick (from
                // another thread) cannot deadlock against dispatch.
                let subscribers: Vec<TickFn> = shared
                    .subscribers
                    .lock()
                    .iter()
                    .map(|(_, tick)| Arc::clone(tick))
                    .collect();
                for tick in subscribers {
                    tick(delta);
                }
            }
            debug!("update clock worker stopped");
        }));
    }
}

impl Drop for UpdateClock {
    fn drop(&mut self) {
        self.shared.abort.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

/// RAII clock subscription.
///
/// Dropping the handle removes the callback from the clock's registry;
/// once `drop` returns, the callback will not be invoked again (a tick
/// already dispatched keeps running to completion).
pub struct Subscription {
    id: u64,
    shared: Arc<ClockShared>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared
            .subscribers
            .lock()
            .retain(|(id, _)| *id != self.id);
        trace!(id = self.id, "clock subscriber removed");
    }
}
