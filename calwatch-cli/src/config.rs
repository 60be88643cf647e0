//! Application configuration.
//!
//! Layered with the `config` crate, later sources winning:
//!   1. built-in defaults
//!   2. ~/.config/calwatch/config.toml (or the file passed with --config)
//!   3. CALWATCH_* environment variables, nested with `__`
//!      (e.g. CALWATCH_TELEGRAM__BOT_TOKEN), after `.env` has been loaded

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use calwatch_core::EngineConfig;
use calwatch_core::message::WeekdayNames;
use chrono::Utc;
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_WATERMARK_FILE: &str = "last_checked.txt";
const DEFAULT_LOOKBACK: &str = "1h";
const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Identity whose own edits are never announced. Falls back to the calendar id.
    #[serde(default)]
    pub self_identity: Option<String>,

    pub watermark_file: PathBuf,
    pub lookback: String,
    pub request_timeout: String,

    /// Seven names, Sunday first
    #[serde(default)]
    pub weekday_names: Option<Vec<String>>,

    #[serde(default)]
    pub google: GoogleConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub calendar_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    pub api_base: Option<String>,
    pub token_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    pub api_base: Option<String>,
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("calwatch");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration. An explicit path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        load_dotenv()?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Self::config_path()?).required(false),
        };

        Self::from_sources(file, Environment::default())
    }

    fn from_sources(
        file: File<config::FileSourceFile, config::FileFormat>,
        env: Environment,
    ) -> Result<Self> {
        Config::builder()
            .set_default("watermark_file", DEFAULT_WATERMARK_FILE)?
            .set_default("lookback", DEFAULT_LOOKBACK)?
            .set_default("request_timeout", DEFAULT_REQUEST_TIMEOUT)?
            .add_source(file)
            .add_source(env.prefix("CALWATCH").prefix_separator("_").separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn self_identity(&self) -> &str {
        match &self.self_identity {
            Some(identity) => identity.trim(),
            None => self.google.calendar_id.trim(),
        }
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.request_timeout)
            .with_context(|| format!("Invalid request_timeout '{}'", self.request_timeout))
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        let lookback = humantime::parse_duration(&self.lookback)
            .with_context(|| format!("Invalid lookback '{}'", self.lookback))?;
        let lookback = chrono::Duration::from_std(lookback)
            .ok()
            .filter(|lookback| Utc::now().checked_sub_signed(*lookback).is_some())
            .with_context(|| format!("Lookback '{}' is too large", self.lookback))?;
        let request_timeout = self.request_timeout()?;

        let weekdays = match &self.weekday_names {
            Some(names) => WeekdayNames::from_names(names.clone())?,
            None => WeekdayNames::default(),
        };

        Ok(EngineConfig {
            self_identity: self.self_identity().to_string(),
            lookback,
            fetch_timeout: request_timeout,
            delivery_timeout: request_timeout,
            weekdays,
        })
    }

    /// Check everything a run needs. Called before the first run so bad setups fail fast.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("google.calendar_id", &self.google.calendar_id),
            ("google.client_id", &self.google.client_id),
            ("google.client_secret", &self.google.client_secret),
            ("google.refresh_token", &self.google.refresh_token),
            ("telegram.bot_token", &self.telegram.bot_token),
            ("telegram.chat_id", &self.telegram.chat_id),
        ];

        let missing: Vec<_> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            bail!(
                "Missing configuration: {}\n\n\
                Set them in {} or as CALWATCH_* environment variables \
                (e.g. CALWATCH_TELEGRAM__BOT_TOKEN).",
                missing.join(", "),
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".to_string())
            );
        }

        if self.self_identity().is_empty() {
            bail!("self_identity must not be empty");
        }

        self.engine_config()?;
        Ok(())
    }
}

fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env");
            Ok(())
        }
        Err(e) if e.not_found() => {
            tracing::debug!("No .env file, skipping");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to load .env"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FULL: &str = r#"
        watermark_file = "/var/lib/calwatch/last_checked.txt"

        [google]
        calendar_id = "team@example.com"
        client_id = "id.apps.googleusercontent.com"
        client_secret = "secret"
        refresh_token = "refresh"

        [telegram]
        bot_token = "123:abc"
        chat_id = "-100200300"
    "#;

    fn load_with(toml: &str, env: &[(&str, &str)]) -> Result<AppConfig> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();

        let vars: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        AppConfig::from_sources(
            File::from(path.as_path()),
            Environment::default().source(Some(vars)),
        )
    }

    #[test]
    fn test_file_values_and_defaults() {
        let config = load_with(FULL, &[]).unwrap();

        assert_eq!(
            config.watermark_file,
            PathBuf::from("/var/lib/calwatch/last_checked.txt")
        );
        assert_eq!(config.lookback, "1h");
        assert_eq!(config.request_timeout, "30s");
        assert_eq!(config.telegram.chat_id, "-100200300");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_watermark_file_defaults_to_working_directory() {
        let config = load_with("", &[]).unwrap();
        assert_eq!(config.watermark_file, PathBuf::from("last_checked.txt"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let config = load_with(
            FULL,
            &[
                ("CALWATCH_TELEGRAM__CHAT_ID", "42"),
                ("CALWATCH_LOOKBACK", "3h"),
            ],
        )
        .unwrap();

        assert_eq!(config.telegram.chat_id, "42");
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.lookback, chrono::Duration::hours(3));
    }

    #[test]
    fn test_self_identity_defaults_to_calendar_id() {
        let config = load_with(FULL, &[]).unwrap();
        assert_eq!(config.self_identity(), "team@example.com");

        let config = load_with(FULL, &[("CALWATCH_SELF_IDENTITY", "me@example.com")]).unwrap();
        assert_eq!(
            config.engine_config().unwrap().self_identity,
            "me@example.com"
        );
    }

    #[test]
    fn test_missing_credentials_are_listed() {
        let config = load_with("[google]\ncalendar_id = \"team@example.com\"\n", &[]).unwrap();
        let err = config.validate().unwrap_err().to_string();

        assert!(err.contains("google.client_id"));
        assert!(err.contains("telegram.bot_token"));
        assert!(!err.contains("google.calendar_id"));
    }

    #[test]
    fn test_blank_self_identity_is_rejected() {
        let config = load_with(FULL, &[("CALWATCH_SELF_IDENTITY", "  ")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_durations_are_rejected() {
        let config = load_with(FULL, &[("CALWATCH_REQUEST_TIMEOUT", "soon")]).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("request_timeout"));
    }

    #[test]
    fn test_lookback_past_the_date_range_is_rejected() {
        let config = load_with(FULL, &[("CALWATCH_LOOKBACK", "100000000years")]).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("too large"));
    }

    #[test]
    fn test_weekday_names_need_seven_entries() {
        let toml = format!("weekday_names = [\"Sun\", \"Mon\"]\n{FULL}");
        let config = load_with(&toml, &[]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
