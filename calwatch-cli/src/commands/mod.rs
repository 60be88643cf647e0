pub mod run;
pub mod status;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use calwatch_core::Engine;
use calwatch_core::watermark::FileWatermark;

use crate::config::AppConfig;
use crate::google::GoogleCalendar;
use crate::telegram::Telegram;

/// Wire the engine to Google Calendar, Telegram and the watermark file.
pub fn build_engine(config: &AppConfig) -> Result<Engine> {
    config.validate()?;

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout()?)
        .build()
        .context("Failed to build HTTP client")?;

    let source = GoogleCalendar::new(http.clone(), &config.google);
    let notifier = Telegram::new(http, &config.telegram);
    let watermark = FileWatermark::new(&config.watermark_file);

    tracing::debug!(
        calendar = %config.google.calendar_id,
        watermark = %watermark.path().display(),
        "Engine ready"
    );

    Ok(Engine::new(
        config.engine_config()?,
        Arc::new(source),
        Arc::new(notifier),
        Arc::new(watermark),
    ))
}
