//! The polling engine: one run reads the watermark, fetches changes since it, notifies
//! about every event that passes the filter, and advances the watermark.
//!
//! A run is all-or-nothing. If any delivery fails the remaining events are not
//! attempted and the watermark stays where it was, so the next run retries the same
//! window. Notifications are at-least-once: a retried window can repeat messages that
//! were already sent before the failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tokio::time::timeout;

use crate::clock::{Clock, SystemClock};
use crate::error::{CalWatchError, CalWatchResult, RunError, RunStage};
use crate::event::{Event, RawEvent};
use crate::filter::{NotificationFilter, Verdict};
use crate::message::{MessageFormatter, WeekdayNames};
use crate::notifier::Notifier;
use crate::source::CalendarSource;
use crate::watermark::WatermarkStore;

const DEFAULT_LOOKBACK_SECS: i64 = 60 * 60;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Events created by this identity are never notified
    pub self_identity: String,
    /// How far back the first run looks when no watermark exists yet
    pub lookback: chrono::Duration,
    pub fetch_timeout: Duration,
    pub delivery_timeout: Duration,
    pub weekdays: WeekdayNames,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            self_identity: String::new(),
            lookback: chrono::Duration::seconds(DEFAULT_LOOKBACK_SECS),
            fetch_timeout: DEFAULT_REQUEST_TIMEOUT,
            delivery_timeout: DEFAULT_REQUEST_TIMEOUT,
            weekdays: WeekdayNames::default(),
        }
    }
}

/// Summary of a successful run.
///
/// An event suppressed for both reasons is counted as self-authored.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub lower_bound: DateTime<FixedOffset>,
    pub run_start: DateTime<FixedOffset>,
    /// The watermark written at the end of the run
    pub watermark: DateTime<FixedOffset>,
    pub first_run: bool,
    pub fetched: usize,
    pub delivered: usize,
    pub suppressed_self: usize,
    pub suppressed_stale: usize,
    pub skipped_unknown: usize,
}

pub struct Engine {
    source: Arc<dyn CalendarSource>,
    notifier: Arc<dyn Notifier>,
    watermark: Arc<dyn WatermarkStore>,
    clock: Arc<dyn Clock>,
    filter: NotificationFilter,
    formatter: MessageFormatter,
    lookback: chrono::Duration,
    fetch_timeout: Duration,
    delivery_timeout: Duration,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn CalendarSource>,
        notifier: Arc<dyn Notifier>,
        watermark: Arc<dyn WatermarkStore>,
    ) -> Self {
        Engine {
            source,
            notifier,
            watermark,
            clock: Arc::new(SystemClock),
            filter: NotificationFilter::new(config.self_identity),
            formatter: MessageFormatter::new(config.weekdays),
            lookback: config.lookback,
            fetch_timeout: config.fetch_timeout,
            delivery_timeout: config.delivery_timeout,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Execute one run.
    #[tracing::instrument(name = "poll", skip_all)]
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let previous = self
            .watermark
            .read()
            .map_err(|e| RunError::new(RunStage::LoadWatermark, e))?;

        let lower_bound = match previous {
            Some(watermark) => watermark,
            None => {
                let lower_bound = self
                    .clock
                    .now()
                    .checked_sub_signed(self.lookback)
                    .ok_or_else(|| {
                        RunError::new(
                            RunStage::LoadWatermark,
                            CalWatchError::Config(format!(
                                "Lookback of {} reaches past the supported date range",
                                self.lookback
                            )),
                        )
                    })?;
                tracing::info!(%lower_bound, "No watermark yet, looking back from now");
                lower_bound
            }
        };

        let run_start = self.clock.now();

        tracing::debug!(%lower_bound, %run_start, "Fetching changes");
        let raw_events = self
            .fetch(lower_bound)
            .await
            .map_err(|e| RunError::new(RunStage::Fetch, e))?;

        let mut report = RunReport {
            lower_bound,
            run_start,
            watermark: run_start,
            first_run: previous.is_none(),
            fetched: raw_events.len(),
            delivered: 0,
            suppressed_self: 0,
            suppressed_stale: 0,
            skipped_unknown: 0,
        };

        for raw in &raw_events {
            let event = Event::from_raw(raw);

            if let Verdict::Suppress {
                self_authored,
                stale,
            } = self.filter.check(&event, run_start)
            {
                tracing::debug!(title = %event, self_authored, stale, "Suppressed");
                if self_authored {
                    report.suppressed_self += 1;
                } else {
                    report.suppressed_stale += 1;
                }
                continue;
            }

            let text = match self.formatter.render(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        title = %event,
                        raw_status = %raw.status,
                        error = %e,
                        "Skipping event"
                    );
                    report.skipped_unknown += 1;
                    continue;
                }
            };

            self.deliver(&event, &text)
                .await
                .map_err(|e| RunError::new(RunStage::Deliver, e))?;

            tracing::debug!(title = %event, status = ?event.status, "Delivered");
            report.delivered += 1;
        }

        // Never move backwards, even if the clock did
        let watermark = previous.map_or(run_start, |previous| previous.max(run_start));
        self.watermark
            .write(watermark)
            .map_err(|e| RunError::new(RunStage::Persist, e))?;
        report.watermark = watermark;

        tracing::info!(
            fetched = report.fetched,
            delivered = report.delivered,
            suppressed_self = report.suppressed_self,
            suppressed_stale = report.suppressed_stale,
            skipped_unknown = report.skipped_unknown,
            "Run complete"
        );

        Ok(report)
    }

    async fn fetch(&self, lower_bound: DateTime<FixedOffset>) -> CalWatchResult<Vec<RawEvent>> {
        timeout(
            self.fetch_timeout,
            self.source.fetch_changes_since(lower_bound),
        )
        .await
        .map_err(|_| CalWatchError::Timeout("Fetching changes", self.fetch_timeout.as_secs()))?
    }

    async fn deliver(&self, event: &Event, text: &str) -> CalWatchResult<()> {
        timeout(self.delivery_timeout, self.notifier.deliver(event, text))
            .await
            .map_err(|_| CalWatchError::Timeout("Delivery", self.delivery_timeout.as_secs()))?
    }
}
