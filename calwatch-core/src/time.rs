//! Time normalization for start/end fields.
//!
//! Full-day fields become midnight (UTC offset) of their date. The source encodes a
//! full-day end as the day *after* the last covered day, so ends are moved back one
//! day: a single-day full-day event normalizes to `start == end`.
//!
//! Timed fields keep the offset they were sent with.
//!
//! A field that fails to parse never aborts processing. It is logged and replaced with
//! [`unset_instant`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::event::RawTime;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sentinel used for fields that could not be parsed (the Unix epoch).
pub fn unset_instant() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

/// Normalize an event's start field.
pub fn normalize_start(raw: &RawTime) -> DateTime<FixedOffset> {
    match raw {
        RawTime::Date(s) => parse_date(s).unwrap_or_else(|e| unparseable("start", s, &e)),
        RawTime::DateTime(s) => parse_timestamp(s).unwrap_or_else(|e| unparseable("start", s, &e)),
        RawTime::Unset => unparseable("start", "", "field is empty"),
    }
}

/// Normalize an event's end field, moving full-day ends back to their last covered day.
pub fn normalize_end(raw: &RawTime) -> DateTime<FixedOffset> {
    match raw {
        RawTime::Date(s) => parse_date(s)
            .and_then(|midnight| {
                midnight
                    .checked_sub_signed(Duration::days(1))
                    .ok_or_else(|| "date out of range".to_string())
            })
            .unwrap_or_else(|e| unparseable("end", s, &e)),
        RawTime::DateTime(s) => parse_timestamp(s).unwrap_or_else(|e| unparseable("end", s, &e)),
        RawTime::Unset => unparseable("end", "", "field is empty"),
    }
}

/// Parse `YYYY-MM-DD` as midnight at the start of that date.
fn parse_date(s: &str) -> Result<DateTime<FixedOffset>, String> {
    let date = NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| e.to_string())?;
    Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
}

/// Parse an RFC 3339 timestamp, preserving its offset.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s.trim()).map_err(|e| e.to_string())
}

fn unparseable(which: &'static str, value: &str, reason: &str) -> DateTime<FixedOffset> {
    tracing::warn!(field = which, value, reason, "Could not parse event time, using sentinel");
    unset_instant()
}
