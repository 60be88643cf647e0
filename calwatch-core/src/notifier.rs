//! Messaging capability.

use async_trait::async_trait;

use crate::error::CalWatchResult;
use crate::event::Event;

/// A channel that notifications are delivered to.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the rendered `text` for `event`. An error means the message was not sent.
    async fn deliver(&self, event: &Event, text: &str) -> CalWatchResult<()>;
}
