use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Clock abstraction shared by the sensing, actuation and control code.
///
/// - now(): monotonic Instant, used for pulse and step timing
/// - sleep(): blocks for the given duration (implementations may simulate)
/// - unix_secs(): wall-clock seconds since the Unix epoch (UTC)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
    fn unix_secs(&self) -> i64;

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Real clock: `Instant` for monotonic time, `SystemTime` for the wall clock.
///
/// Wall time is whatever the host has synchronized to (NTP is the OS's job).
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }

    fn unix_secs(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset, unix_secs() = start + offset.
/// sleep(d) advances both without actually sleeping, so a whole control
/// cycle (including motor travel) runs instantly under test or simulation.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    start_unix: i64,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start the wall clock at the given Unix time.
    pub fn starting_at(start_unix: i64) -> Self {
        Self {
            origin: Instant::now(),
            start_unix,
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Total time advanced since construction.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }

    fn unix_secs(&self) -> i64 {
        self.start_unix + self.elapsed().as_secs() as i64
    }
}
