//! Court-local calendar helpers.
//!
//! Every calendar-day comparison in the register shifts instants by a fixed
//! +05:00 before truncating to a date. The host timezone is never consulted,
//! so report totals are identical on every machine.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Offset applied to every timestamp before it is reduced to a date.
pub const COURT_UTC_OFFSET_SECS: i32 = 5 * 3600;

/// The fixed court offset as a chrono [`FixedOffset`].
pub fn court_offset() -> FixedOffset {
  FixedOffset::east_opt(COURT_UTC_OFFSET_SECS).expect("+05:00 is a valid offset")
}

/// `instant` expressed in court-local time.
pub fn court_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
  instant.with_timezone(&court_offset())
}

/// The court-local calendar day containing `instant`.
pub fn court_date(instant: DateTime<Utc>) -> NaiveDate {
  court_time(instant).date_naive()
}

/// The court-local calendar day after the one containing `now`.
pub fn court_tomorrow(now: DateTime<Utc>) -> NaiveDate {
  court_date(now).succ_opt().unwrap_or(NaiveDate::MAX)
}

/// Render an instant the way report tables and CSV exports show it.
pub fn format_instant(instant: DateTime<Utc>) -> String {
  court_time(instant).format("%Y-%m-%d %H:%M:%S").to_string()
}
