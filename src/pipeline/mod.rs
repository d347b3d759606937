//! Pipeline entry points for watcher operations.
//!
//! - `Watcher::run`: Poll every target on an interval
//! - `Watcher::run_cycle`: Poll every target once

pub mod watch;

pub use watch::{WatchSettings, Watcher, log_report};
