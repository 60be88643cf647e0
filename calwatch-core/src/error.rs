//! Error types for calwatch.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::event::EventStatus;

/// Errors that can occur while watching a calendar.
#[derive(Error, Debug)]
pub enum CalWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar source error: {0}")]
    Source(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("{0} timed out after {1}s")]
    Timeout(&'static str, u64),

    #[error("Watermark at {} is corrupt: {reason}", path.display())]
    CorruptWatermark { path: PathBuf, reason: String },

    #[error("No message template for status {status:?} (event '{title}')")]
    NoTemplate { title: String, status: EventStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for calwatch operations.
pub type CalWatchResult<T> = Result<T, CalWatchError>;

/// The stage of a run in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadWatermark,
    Fetch,
    Deliver,
    Persist,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStage::LoadWatermark => "loading the watermark",
            RunStage::Fetch => "fetching changes",
            RunStage::Deliver => "delivering notifications",
            RunStage::Persist => "persisting the watermark",
        };
        f.write_str(label)
    }
}

/// A failed run. The watermark is never advanced when this is returned.
#[derive(Error, Debug)]
#[error("Run failed while {stage}: {source}")]
pub struct RunError {
    pub stage: RunStage,
    #[source]
    pub source: CalWatchError,
}

impl RunError {
    pub fn new(stage: RunStage, source: CalWatchError) -> Self {
        RunError { stage, source }
    }
}
