//! Durable watermark: the instant through which changes have been processed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, SecondsFormat, Timelike};

use crate::error::{CalWatchError, CalWatchResult};

/// Storage for the single watermark value.
///
/// `read` returns `Ok(None)` when no watermark was ever written. A store that exists but
/// cannot be read or parsed is an error, never "absent".
pub trait WatermarkStore: Send + Sync {
    fn read(&self) -> CalWatchResult<Option<DateTime<FixedOffset>>>;
    fn write(&self, instant: DateTime<FixedOffset>) -> CalWatchResult<()>;
}

/// Canonical on-disk encoding: RFC 3339, whole seconds, explicit offset.
pub fn encode(instant: &DateTime<FixedOffset>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Watermark kept in a single text file.
#[derive(Debug, Clone)]
pub struct FileWatermark {
    path: PathBuf,
}

impl FileWatermark {
    /// `~` in the path is expanded to the home directory.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).into_owned();
        FileWatermark {
            path: PathBuf::from(expanded),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WatermarkStore for FileWatermark {
    fn read(&self) -> CalWatchResult<Option<DateTime<FixedOffset>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let instant = DateTime::parse_from_rfc3339(content.trim()).map_err(|e| {
            CalWatchError::CorruptWatermark {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Some(instant))
    }

    fn write(&self, instant: DateTime<FixedOffset>) -> CalWatchResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a half-written watermark
        let temp = self.temp_path();
        std::fs::write(&temp, encode(&instant))?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Watermark held in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryWatermark {
    value: Mutex<Option<DateTime<FixedOffset>>>,
}

impl MemoryWatermark {
    pub fn new(initial: Option<DateTime<FixedOffset>>) -> Self {
        MemoryWatermark {
            value: Mutex::new(initial),
        }
    }
}

impl WatermarkStore for MemoryWatermark {
    fn read(&self) -> CalWatchResult<Option<DateTime<FixedOffset>>> {
        Ok(*self.value.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn write(&self, instant: DateTime<FixedOffset>) -> CalWatchResult<()> {
        // Same whole-second precision as the file encoding
        let stored = instant.with_nanosecond(0).unwrap_or(instant);
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(stored);
        Ok(())
    }
}
