//! Core of calwatch: change detection and notification decisions.
//!
//! - `event`, `time`, `status`: turning raw source records into normalized events
//! - `filter`, `message`: deciding what to notify and how it reads
//! - `watermark`: remembering how far previous runs got
//! - `engine`: one polling run tying it all together
//!
//! Calendar sources and messaging channels plug in through the `CalendarSource` and
//! `Notifier` traits.

pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod message;
pub mod notifier;
pub mod source;
pub mod status;
pub mod time;
pub mod watermark;

pub use engine::{Engine, EngineConfig, RunReport};
pub use error::{CalWatchError, CalWatchResult, RunError, RunStage};
pub use event::*;
