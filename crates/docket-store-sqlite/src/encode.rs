//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; aggregate keys as their
//! camelCase names.

use chrono::{DateTime, Utc};
use docket_core::store::AggregateKey;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AggregateKey ────────────────────────────────────────────────────────────

pub fn encode_key(key: AggregateKey) -> &'static str { key.as_str() }

pub fn decode_key(s: &str) -> Result<AggregateKey> {
  s.parse().map_err(|_| Error::UnknownKey(s.to_owned()))
}
