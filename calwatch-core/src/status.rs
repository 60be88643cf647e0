//! Lifecycle status inference.

use crate::event::EventStatus;
use crate::time::parse_timestamp;

const STATUS_CONFIRMED: &str = "confirmed";
const STATUS_CANCELLED: &str = "cancelled";

/// Creation and update stamps closer than this are treated as the same moment.
const SAME_MOMENT_MS: i64 = 1_000;

/// Infer an event's status from the source's status tag and its creation/update stamps.
///
/// A confirmed event whose update stamp differs from its creation stamp by at least a
/// second has been edited since it was created. Unparseable stamps count as "not
/// updated".
pub fn classify(raw_status: &str, created: &str, updated: &str) -> EventStatus {
    match raw_status {
        STATUS_CONFIRMED => {
            if was_updated(created, updated) {
                EventStatus::Updated
            } else {
                EventStatus::Created
            }
        }
        STATUS_CANCELLED => EventStatus::Canceled,
        _ => EventStatus::Unknown,
    }
}

fn was_updated(created: &str, updated: &str) -> bool {
    match (parse_timestamp(created), parse_timestamp(updated)) {
        (Ok(created), Ok(updated)) => {
            (updated - created).num_milliseconds().abs() >= SAME_MOMENT_MS
        }
        (created, updated) => {
            tracing::debug!(
                created_ok = created.is_ok(),
                updated_ok = updated.is_ok(),
                "Unparseable creation/update stamp, treating event as new"
            );
            false
        }
    }
}
