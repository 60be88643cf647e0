//! Calendar source capability.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::CalWatchResult;
use crate::event::RawEvent;

/// A calendar that can report the events changed since a given instant.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Events whose last change is at or after `lower_bound`, in the source's order.
    async fn fetch_changes_since(
        &self,
        lower_bound: DateTime<FixedOffset>,
    ) -> CalWatchResult<Vec<RawEvent>>;
}
