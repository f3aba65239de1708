//! Localized wall-clock timestamps for telemetry records.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::util::SECS_PER_HOUR;

/// `YYYY/MM/DD HH:MM:SS`, as the dashboard parses it.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Format a Unix time shifted by a fixed whole-hour offset from UTC.
///
/// Offsets chrono cannot represent fall back to UTC; out-of-range times fall
/// back to the epoch.
pub fn local_timestamp(unix_secs: i64, utc_offset_hours: i32) -> String {
    let offset = i32::try_from(i64::from(utc_offset_hours) * SECS_PER_HOUR)
        .ok()
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    let utc: DateTime<Utc> = DateTime::from_timestamp(unix_secs, 0).unwrap_or_default();
    utc.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}
