//! Per-event deliver/suppress decision.

use chrono::{DateTime, FixedOffset};

use crate::event::Event;

/// Outcome of filtering one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Deliver,
    Suppress { self_authored: bool, stale: bool },
}

impl Verdict {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Verdict::Deliver)
    }
}

/// Suppresses events created by our own identity and events that started before the
/// run began. Both checks always run.
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    self_identity: String,
}

impl NotificationFilter {
    pub fn new(self_identity: impl Into<String>) -> Self {
        NotificationFilter {
            self_identity: self_identity.into(),
        }
    }

    pub fn check(&self, event: &Event, run_start: DateTime<FixedOffset>) -> Verdict {
        let self_authored = event.creator == self.self_identity;
        let stale = event.start < run_start;

        if self_authored || stale {
            Verdict::Suppress {
                self_authored,
                stale,
            }
        } else {
            Verdict::Deliver
        }
    }
}
