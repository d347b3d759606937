// src/models/mod.rs

//! Domain models for the watcher.
//!
//! Configuration, watched targets, and the per-cycle report types.

mod config;
mod report;
mod target;

// Re-export all public types
pub use config::{
    Config, OtpConfig, Priority, PushoverConfig, ServerConfig, WatcherConfig,
};
pub use report::{AvailabilitySignal, CheckOutcome, CheckResult, CycleReport};
pub use target::{TESTFLIGHT_JOIN_URL, Target, normalize_target_url};
