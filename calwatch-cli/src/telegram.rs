//! Telegram Bot API notifier.

use async_trait::async_trait;
use calwatch_core::notifier::Notifier;
use calwatch_core::{CalWatchError, CalWatchResult, Event};
use serde::{Deserialize, Serialize};

use crate::config::TelegramConfig;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct Telegram {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl Telegram {
    pub fn new(http: reqwest::Client, config: &TelegramConfig) -> Self {
        Telegram {
            http,
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl Notifier for Telegram {
    async fn deliver(&self, event: &Event, text: &str) -> CalWatchResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        // The URL carries the bot token, keep it out of error messages
        let response = self
            .http
            .post(url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: "MarkdownV2",
            })
            .send()
            .await
            .map_err(|e| {
                CalWatchError::Delivery(format!("Failed to reach Telegram: {}", e.without_url()))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse {
                description: Some(description),
                ..
            }) => Err(CalWatchError::Delivery(format!(
                "Telegram rejected '{}' ({}): {}",
                event.title, status, description
            ))),
            _ => Err(CalWatchError::Delivery(format!(
                "Telegram rejected '{}' ({}): {}",
                event.title, status, body
            ))),
        }
    }
}
