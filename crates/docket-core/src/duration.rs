//! Elapsed-custody durations shown next to each report row.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::file::FileRecord;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
/// Months are counted as 30-day blocks.
const MONTH: i64 = 30 * DAY;

/// The largest unit a duration is displayed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
  Months,
  Days,
  Hours,
}

/// A non-negative span broken into calendar-ish components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CustodyDuration {
  pub months:  i64,
  pub days:    i64,
  pub hours:   i64,
  pub minutes: i64,
  pub seconds: i64,
}

impl CustodyDuration {
  /// Span from `start` to `end`; negative spans clamp to zero.
  pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
    let mut rest = (end - start).num_seconds().max(0);
    let months = rest / MONTH;
    rest %= MONTH;
    let days = rest / DAY;
    rest %= DAY;
    let hours = rest / HOUR;
    rest %= HOUR;
    Self { months, days, hours, minutes: rest / MINUTE, seconds: rest % MINUTE }
  }

  /// How long `file` has been (or was) out: to `returned_at` when returned,
  /// otherwise to `now`.
  pub fn of(file: &FileRecord, now: DateTime<Utc>) -> Self {
    Self::between(file.delivered_at, file.returned_at.unwrap_or(now))
  }

  pub fn leading_unit(&self) -> Unit {
    if self.months >= 1 {
      Unit::Months
    } else if self.days >= 1 {
      Unit::Days
    } else {
      Unit::Hours
    }
  }
}

impl fmt::Display for CustodyDuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.leading_unit() {
      Unit::Months => write!(f, "{}mo {}d ", self.months, self.days)?,
      Unit::Days => write!(f, "{}d ", self.days)?,
      Unit::Hours => {}
    }
    write!(f, "{:02}h {:02}m {:02}s", self.hours, self.minutes, self.seconds)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() }

  #[test]
  fn under_a_day_starts_at_hours() {
    let d = CustodyDuration::between(t0(), t0() + TimeDelta::seconds(3 * 3600 + 5 * 60 + 9));
    assert_eq!(d.leading_unit(), Unit::Hours);
    assert_eq!(d.to_string(), "03h 05m 09s");
  }

  #[test]
  fn days_lead_when_at_least_one_day() {
    let d = CustodyDuration::between(t0(), t0() + TimeDelta::days(9) + TimeDelta::hours(23));
    assert_eq!(d.leading_unit(), Unit::Days);
    assert_eq!(d.to_string(), "9d 23h 00m 00s");
  }

  #[test]
  fn months_lead_after_thirty_days() {
    let d = CustodyDuration::between(t0(), t0() + TimeDelta::days(65));
    assert_eq!(d.months, 2);
    assert_eq!(d.days, 5);
    assert_eq!(d.to_string(), "2mo 5d 00h 00m 00s");
  }

  #[test]
  fn negative_span_is_zero() {
    let d = CustodyDuration::between(t0(), t0() - TimeDelta::hours(1));
    assert_eq!(d, CustodyDuration::default());
  }
}
