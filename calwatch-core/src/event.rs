//! Event types.
//!
//! A `RawEvent` is what a calendar source hands over: text fields exactly as the
//! provider returned them. `Event::from_raw` normalizes times and infers the
//! lifecycle status, producing the value the filter and notifier work with.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::status::classify;
use crate::time::{normalize_end, normalize_start};

/// A changed event as reported by a calendar source (provider-neutral, unparsed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: String,
    /// Provider status tag, e.g. "confirmed" or "cancelled"
    pub status: String,
    pub creator: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created: String,
    /// Last update timestamp (RFC 3339)
    pub updated: String,
    pub start: RawTime,
    pub end: RawTime,
}

/// A start or end field as the source encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawTime {
    /// Full-day field, `YYYY-MM-DD`
    Date(String),
    /// Timed field with an offset, RFC 3339
    DateTime(String),
    /// The source sent neither
    Unset,
}

/// Lifecycle status of a changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Created,
    Updated,
    Canceled,
    Unknown,
}

/// A normalized event, ready for filtering and delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Empty when the source did not report a creator
    pub creator: String,
    pub status: EventStatus,
}

impl Event {
    pub fn from_raw(raw: &RawEvent) -> Self {
        Event {
            title: raw.title.clone(),
            start: normalize_start(&raw.start),
            end: normalize_end(&raw.end),
            creator: raw.creator.clone().unwrap_or_default(),
            status: classify(&raw.status, &raw.created, &raw.updated),
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.title.is_empty() {
            write!(f, "(No title)")
        } else {
            write!(f, "{}", self.title)
        }
    }
}
