use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use raincatch_hardware::error::HwError;
use raincatch_hardware::util::wait_for_level_with_timeout;

#[test]
fn wait_for_low_success_path() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    // Flip low after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_for_level_with_timeout(
        || high.load(Ordering::Relaxed),
        false,
        Duration::from_millis(500),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_for_high_spinning_success_path() {
    let high = Arc::new(AtomicBool::new(false));
    let high_bg = high.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(2));
        high_bg.store(true, Ordering::Relaxed);
    });

    let start = Instant::now();
    let seen = wait_for_level_with_timeout(
        || high.load(Ordering::Relaxed),
        true,
        Duration::from_millis(500),
        Duration::ZERO,
    )
    .expect("line should rise");
    assert!(seen >= start);
}

#[test]
fn wait_for_low_timeout_path() {
    let high = Arc::new(AtomicBool::new(true));

    let err = wait_for_level_with_timeout(
        || high.load(Ordering::Relaxed),
        false,
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::LevelTimeout { want_high: false } => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn already_at_level_returns_immediately() {
    let res = wait_for_level_with_timeout(|| true, true, Duration::ZERO, Duration::ZERO);
    assert!(res.is_ok());
}
