use anyhow::{Context, Result};
use calwatch_core::watermark::{FileWatermark, WatermarkStore, encode};

use crate::config::AppConfig;

pub fn run(config: &AppConfig) -> Result<()> {
    let watermark = FileWatermark::new(&config.watermark_file);

    let last_checked = watermark
        .read()
        .with_context(|| format!("Failed to read {}", watermark.path().display()))?;

    match last_checked {
        Some(instant) => println!("Last checked: {}", encode(&instant)),
        None => println!("Never run (no watermark at {})", watermark.path().display()),
    }

    Ok(())
}
