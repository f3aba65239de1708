use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `is_high()` reports `want_high`, or `timeout` expires.
///
/// Returns the instant the level was first observed. A zero `poll_interval`
/// busy-spins, which is what echo timing needs (pulse widths are in the
/// hundreds of microseconds); anything else sleeps between polls.
pub fn wait_for_level_with_timeout(
    mut is_high: impl FnMut() -> bool,
    want_high: bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        if is_high() == want_high {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::LevelTimeout { want_high });
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Busy-wait for very short delays where `thread::sleep` granularity is too coarse.
#[inline]
pub fn spin_delay(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}
