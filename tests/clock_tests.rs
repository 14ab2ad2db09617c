//! UpdateClock dispatch and subscription lifetimes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use chirp::clock::UpdateClock;

#[test]
fn subscribers_receive_measured_deltas() {
    let clock = UpdateClock::new(Duration::from_millis(5));
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&deltas);
    let _subscription = clock.subscribe(move |delta| {
        sink.lock().unwrap().push(delta);
    });

    sleep(Duration::from_millis(100));

    let deltas = deltas.lock().unwrap();
    assert!(deltas.len() >= 2, "expected multiple ticks, got {}", deltas.len());
    // Deltas are measured, not assumed: every one covers at least the
    // nominal interval.
    assert!(deltas.iter().all(|d| *d >= Duration::from_millis(5)));
}

#[test]
fn all_subscribers_of_a_clock_are_dispatched() {
    let clock = UpdateClock::new(Duration::from_millis(5));
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&first);
    let _a = clock.subscribe(move |_| {
        counter.fetch_add(1, Ordering::AcqRel);
    });
    let counter = Arc::clone(&second);
    let _b = clock.subscribe(move |_| {
        counter.fetch_add(1, Ordering::AcqRel);
    });

    sleep(Duration::from_millis(100));
    assert!(first.load(Ordering::Acquire) >= 2);
    assert!(second.load(Ordering::Acquire) >= 2);
}

#[test]
fn dropping_a_subscription_stops_its_ticks() {
    let clock = UpdateClock::new(Duration::from_millis(5));
    let count = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&count);
    let subscription = clock.subscribe(move |_| {
        counter.fetch_add(1, Ordering::AcqRel);
    });

    sleep(Duration::from_millis(60));
    drop(subscription);
    let at_drop = count.load(Ordering::Acquire);
    assert!(at_drop >= 1);

    // One already-dispatched tick may still land; afterwards the count
    // is frozen.
    sleep(Duration::from_millis(30));
    let settled = count.load(Ordering::Acquire);
    sleep(Duration::from_millis(60));
    assert_eq!(count.load(Ordering::Acquire), settled);
}

#[test]
fn dropping_the_clock_joins_its_worker() {
    let count = Arc::new(AtomicUsize::new(0));
    let subscription;
    {
        let clock = UpdateClock::new(Duration::from_millis(5));
        let counter = Arc::clone(&count);
        subscription = clock.subscribe(move |_| {
            counter.fetch_add(1, Ordering::AcqRel);
        });
        sleep(Duration::from_millis(40));
        // Clock dropped here; its Drop joins the worker thread.
    }
    let after_drop = count.load(Ordering::Acquire);
    sleep(Duration::from_millis(40));
    assert_eq!(count.load(Ordering::Acquire), after_drop);
    drop(subscription);
}

#[test]
fn interval_is_reported_back() {
    let clock = UpdateClock::new(Duration::from_millis(10));
    assert_eq!(clock.interval(), Duration::from_millis(10));
}
