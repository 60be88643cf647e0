//! Notification text for changed events.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::error::{CalWatchError, CalWatchResult};
use crate::event::{Event, EventStatus};

const DEFAULT_WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MARKDOWN_V2_RESERVED: [char; 19] = [
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
    '!',
];

/// Weekday display names, Sunday first. Built once at startup and never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayNames([String; 7]);

impl Default for WeekdayNames {
    fn default() -> Self {
        WeekdayNames(DEFAULT_WEEKDAYS.map(String::from))
    }
}

impl WeekdayNames {
    /// Build from exactly seven names, Sunday first.
    pub fn from_names(names: Vec<String>) -> CalWatchResult<Self> {
        let count = names.len();
        let names: [String; 7] = names.try_into().map_err(|_| {
            CalWatchError::Config(format!("Expected 7 weekday names, got {}", count))
        })?;
        Ok(WeekdayNames(names))
    }

    pub fn name_of(&self, instant: &DateTime<FixedOffset>) -> &str {
        &self.0[instant.weekday().num_days_from_sunday() as usize]
    }
}

/// Renders events into Telegram MarkdownV2 messages.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    weekdays: WeekdayNames,
}

impl MessageFormatter {
    pub fn new(weekdays: WeekdayNames) -> Self {
        MessageFormatter { weekdays }
    }

    /// Render the message for an event. `Unknown` events have no template.
    pub fn render(&self, event: &Event) -> CalWatchResult<String> {
        let title = escape_markdown(&event.title);
        let start = escape_markdown(&self.format_instant(&event.start));
        let end = escape_markdown(&self.format_instant(&event.end));

        let heading = match event.status {
            EventStatus::Created => format!("🗓️ *{title}*"),
            EventStatus::Updated => format!("✍🏻 *Update: {title}*"),
            EventStatus::Canceled => format!("🆇 *Cancelled: {title}*"),
            EventStatus::Unknown => {
                return Err(CalWatchError::NoTemplate {
                    title: event.title.clone(),
                    status: event.status,
                });
            }
        };

        Ok(format!("{heading}\n\n*Start:* {start}\n*End:* {end}"))
    }

    /// Midnight renders as a bare date, anything else with its time of day. Both are
    /// followed by the weekday name, in the instant's own offset.
    pub fn format_instant(&self, instant: &DateTime<FixedOffset>) -> String {
        let weekday = self.weekdays.name_of(instant);

        if instant.num_seconds_from_midnight() == 0 {
            format!("{} ({})", instant.format("%Y-%m-%d"), weekday)
        } else {
            format!("{} ({})", instant.format("%Y-%m-%d %H:%M:%S"), weekday)
        }
    }
}

/// Escape every character MarkdownV2 reserves. Escapes hold inside entities too, so
/// interpolated text can never open or close one.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
