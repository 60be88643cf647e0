use std::future::Future;
use std::time::Duration;

use anyhow::{Result, bail};
use calwatch_core::Engine;
use tokio::time::{MissedTickBehavior, interval};

use crate::commands::build_engine;
use crate::config::AppConfig;

/// Parse `--every`. Zero would spin without pause, so it is rejected.
pub fn parse_every(value: &str) -> Result<Duration, String> {
    let every = humantime::parse_duration(value).map_err(|e| e.to_string())?;
    if every.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(every)
}

pub async fn run(config: &AppConfig, every: Duration) -> Result<()> {
    let engine = build_engine(config)?;

    watch_until(&engine, every, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run on every tick until `shutdown` completes. Runs never overlap, and a failed run is
/// logged and retried on the next tick with the same window. Shutdown also interrupts a
/// run in flight; its watermark is simply not advanced.
pub async fn watch_until<F>(engine: &Engine, every: Duration, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    if every.is_zero() {
        bail!("Watch interval must be greater than zero");
    }

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    tracing::info!(every = %humantime::format_duration(every), "Watching for changes");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                tracing::info!("Interrupted, stopping");
                return Ok(());
            }
        }

        tokio::select! {
            result = engine.run() => {
                if let Err(e) = result {
                    tracing::error!(stage = %e.stage, error = %e.source, "Run failed");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Interrupted during a run, watermark left unchanged");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use calwatch_core::notifier::Notifier;
    use calwatch_core::source::CalendarSource;
    use calwatch_core::watermark::{MemoryWatermark, WatermarkStore};
    use calwatch_core::{CalWatchResult, EngineConfig, Event, RawEvent};
    use chrono::{DateTime, FixedOffset};

    /// Source that never answers, counting how often it was asked
    #[derive(Default)]
    struct HangingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CalendarSource for HangingSource {
        async fn fetch_changes_since(
            &self,
            _lower_bound: DateTime<FixedOffset>,
        ) -> CalWatchResult<Vec<RawEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn deliver(&self, _event: &Event, _text: &str) -> CalWatchResult<()> {
            Ok(())
        }
    }

    fn engine(source: Arc<HangingSource>, watermark: Arc<MemoryWatermark>) -> Engine {
        let config = EngineConfig {
            self_identity: "me@example.com".to_string(),
            ..EngineConfig::default()
        };
        Engine::new(config, source, Arc::new(NoopNotifier), watermark)
    }

    #[test]
    fn test_parse_every() {
        assert_eq!(parse_every("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_every("90s").unwrap(), Duration::from_secs(90));
        assert!(parse_every("0s").is_err());
        assert!(parse_every("often").is_err());
    }

    #[tokio::test]
    async fn test_zero_interval_is_an_error() {
        let source = Arc::new(HangingSource::default());
        let engine = engine(source.clone(), Arc::new(MemoryWatermark::default()));

        let result = watch_until(&engine, Duration::ZERO, async {}).await;

        assert!(result.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_run_in_flight() {
        let source = Arc::new(HangingSource::default());
        let watermark = Arc::new(MemoryWatermark::default());
        let engine = engine(source.clone(), watermark.clone());

        // The first tick fires at once, so the run is already waiting on the source
        watch_until(
            &engine,
            Duration::from_secs(60),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(watermark.read().unwrap(), None);
    }
}
