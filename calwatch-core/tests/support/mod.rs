//! Test doubles for the engine's capabilities.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use calwatch_core::clock::Clock;
use calwatch_core::notifier::Notifier;
use calwatch_core::source::CalendarSource;
use calwatch_core::watermark::WatermarkStore;
use calwatch_core::{CalWatchError, CalWatchResult, Event, RawEvent, RawTime};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

pub const ME: &str = "me@example.com";
pub const SOMEONE_ELSE: &str = "bob@example.com";

/// Source returning queued batches, one per call; empty once the queue runs out.
#[derive(Default)]
pub struct FakeSource {
    batches: Mutex<VecDeque<CalWatchResult<Vec<RawEvent>>>>,
    calls: Mutex<Vec<DateTime<FixedOffset>>>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(self, events: Vec<RawEvent>) -> Self {
        self.batches.lock().unwrap().push_back(Ok(events));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(CalWatchError::Source(message.to_string())));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Lower bounds this source was asked for, in call order.
    pub fn calls(&self) -> Vec<DateTime<FixedOffset>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarSource for FakeSource {
    async fn fetch_changes_since(
        &self,
        lower_bound: DateTime<FixedOffset>,
    ) -> CalWatchResult<Vec<RawEvent>> {
        self.calls.lock().unwrap().push(lower_bound);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.batches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(vec![]))
    }
}

/// Notifier recording every attempt; optionally fails on the nth attempt (1-based).
#[derive(Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<(Event, String)>>,
    fail_on_attempt: Option<usize>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(attempt: usize) -> Self {
        RecordingNotifier {
            fail_on_attempt: Some(attempt),
            ..Self::default()
        }
    }

    /// Records the attempt, then takes `delay` to answer.
    pub fn slow(delay: Duration) -> Self {
        RecordingNotifier {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> Vec<(Event, String)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.attempts().into_iter().map(|(e, _)| e.title).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, event: &Event, text: &str) -> CalWatchResult<()> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push((event.clone(), text.to_string()));
            attempts.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if Some(attempt) == self.fail_on_attempt {
            return Err(CalWatchError::Delivery("chat not found".to_string()));
        }
        Ok(())
    }
}

/// Watermark store whose writes always fail.
pub struct ReadOnlyWatermark(pub Option<DateTime<FixedOffset>>);

impl WatermarkStore for ReadOnlyWatermark {
    fn read(&self) -> CalWatchResult<Option<DateTime<FixedOffset>>> {
        Ok(self.0)
    }

    fn write(&self, _instant: DateTime<FixedOffset>) -> CalWatchResult<()> {
        Err(CalWatchError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }
}

/// Clock stuck at a fixed instant.
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

pub fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

pub fn rfc3339(instant: DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// A freshly created, confirmed, timed event.
pub fn raw_event(title: &str, creator: &str, start: DateTime<FixedOffset>) -> RawEvent {
    let stamp = rfc3339(start - chrono::Duration::days(7));
    RawEvent {
        title: title.to_string(),
        status: "confirmed".to_string(),
        creator: Some(creator.to_string()),
        created: stamp.clone(),
        updated: stamp,
        start: RawTime::DateTime(rfc3339(start)),
        end: RawTime::DateTime(rfc3339(start + chrono::Duration::hours(1))),
    }
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
