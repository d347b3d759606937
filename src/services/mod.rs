//! Service layer for the watcher.
//!
//! This module contains the business logic for:
//! - One-time removal tokens (`TokenService`)
//! - Page status classification (`StatusClassifier`)
//! - Push notifications (`Notifier`, `PushoverNotifier`)
//! - The watched-target list (`TargetRegistry`)

mod classifier;
mod notifier;
mod registry;
mod tokens;

pub use classifier::{Classification, STATUS_SELECTOR, StatusClassifier};
pub use notifier::{NotifyOptions, Notifier, PUSHOVER_ENDPOINT, PushoverNotifier};
pub use registry::{TARGETS_KEY, TargetRegistry};
pub use tokens::{Clock, SystemClock, TOKEN_LEN, TokenService};
