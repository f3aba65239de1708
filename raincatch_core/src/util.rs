//! Common timing helpers for raincatch_core.

use std::time::Duration;

/// Number of seconds in one hour.
pub const SECS_PER_HOUR: i64 = 3_600;

/// Split one step period into the high and low half-periods.
/// The low half takes the odd microsecond, so the pair always sums to `period_us`.
#[inline]
pub fn split_step_period(period_us: u64) -> (Duration, Duration) {
    let high = period_us / 2;
    (
        Duration::from_micros(high),
        Duration::from_micros(period_us - high),
    )
}

/// Whole seconds between two wall-clock instants, never negative.
#[inline]
pub fn elapsed_secs(since: i64, now: i64) -> i64 {
    now.saturating_sub(since).max(0)
}
