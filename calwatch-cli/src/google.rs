//! Google Calendar as a change source.
//!
//! Authenticates with an OAuth refresh token and lists events updated since the lower
//! bound through the Calendar v3 REST API. Fields are handed to the core as raw text so
//! the core decides how to parse them.

use async_trait::async_trait;
use calwatch_core::source::CalendarSource;
use calwatch_core::{CalWatchError, CalWatchResult, RawEvent, RawTime};
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::GoogleConfig;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before Google says the token expires
const EXPIRY_MARGIN_SECS: i64 = 60;

pub struct GoogleCalendar {
    http: reqwest::Client,
    calendar_id: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    api_base: String,
    token_url: String,
    session: Mutex<Option<Session>>,
}

#[derive(Clone)]
struct Session {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

impl GoogleCalendar {
    pub fn new(http: reqwest::Client, config: &GoogleConfig) -> Self {
        GoogleCalendar {
            http,
            calendar_id: config.calendar_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token_url: config
                .token_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            session: Mutex::new(None),
        }
    }

    /// A valid access token, refreshing the cached one if it has expired.
    async fn access_token(&self) -> CalWatchResult<String> {
        let mut session = self.session.lock().await;

        if let Some(current) = session.as_ref().filter(|s| !s.is_expired()) {
            return Ok(current.access_token.clone());
        }

        let refreshed = self.refresh().await?;
        let token = refreshed.access_token.clone();
        *session = Some(refreshed);
        Ok(token)
    }

    async fn refresh(&self) -> CalWatchResult<Session> {
        tracing::debug!("Refreshing Google access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| CalWatchError::Source(format!("Failed to refresh Google token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CalWatchError::Source(format!(
                "Failed to refresh Google token ({}): {}",
                status, error_text
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            CalWatchError::Source(format!("Failed to parse Google token response: {}", e))
        })?;

        Ok(Session {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    fn events_url(&self) -> CalWatchResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| CalWatchError::Config(format!("Invalid Google API base: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| CalWatchError::Config("Google API base cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);

        Ok(url)
    }

    async fn fetch_page(
        &self,
        url: &reqwest::Url,
        updated_min: &str,
        page_token: Option<&str>,
    ) -> CalWatchResult<EventsPage> {
        let access_token = self.access_token().await?;

        let mut query = vec![
            ("updatedMin", updated_min),
            ("singleEvents", "true"),
            ("orderBy", "updated"),
            ("showDeleted", "false"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| CalWatchError::Source(format!("Failed to list events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CalWatchError::Source(format!(
                "Google Calendar returned {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CalWatchError::Source(format!("Failed to parse events: {}", e)))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendar {
    async fn fetch_changes_since(
        &self,
        lower_bound: DateTime<FixedOffset>,
    ) -> CalWatchResult<Vec<RawEvent>> {
        let url = self.events_url()?;
        let updated_min = lower_bound.to_rfc3339_opts(SecondsFormat::Secs, false);

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(&url, &updated_min, page_token.as_deref())
                .await?;

            tracing::debug!(count = page.items.len(), "Fetched events page");
            events.extend(page.items.into_iter().map(RawEvent::from_google));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(events)
    }
}

// Calendar v3 wire types, restricted to the fields we read.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    status: String,
    creator: Option<GooglePerson>,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
    start: Option<GoogleTime>,
    end: Option<GoogleTime>,
}

#[derive(Debug, Deserialize)]
struct GooglePerson {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTime {
    date: Option<String>,
    date_time: Option<String>,
}

pub trait FromGoogle {
    fn from_google(event: GoogleEvent) -> Self;
}

impl FromGoogle for RawEvent {
    fn from_google(event: GoogleEvent) -> Self {
        RawEvent {
            title: event.summary,
            status: event.status,
            creator: event.creator.and_then(|c| c.email),
            created: event.created,
            updated: event.updated,
            start: raw_time(event.start),
            end: raw_time(event.end),
        }
    }
}

// A timed value wins if Google sends both
fn raw_time(time: Option<GoogleTime>) -> RawTime {
    match time {
        Some(GoogleTime {
            date_time: Some(dt),
            ..
        }) => RawTime::DateTime(dt),
        Some(GoogleTime { date: Some(d), .. }) => RawTime::Date(d),
        _ => RawTime::Unset,
    }
}
