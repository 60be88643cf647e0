use anyhow::Result;

use crate::commands::build_engine;
use crate::config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    let engine = build_engine(config)?;
    let report = engine.run().await?;

    let suppressed = report.suppressed_self + report.suppressed_stale;
    println!(
        "Delivered {} of {} changed event(s) ({} suppressed, {} skipped)",
        report.delivered, report.fetched, suppressed, report.skipped_unknown
    );

    Ok(())
}
