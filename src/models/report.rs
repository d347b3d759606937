//! Per-target check outcomes and the batch report of one poll cycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Target;

/// Classified state of a signup page on one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AvailabilitySignal {
    /// "This beta is full."
    Full,
    /// "This beta isn't accepting any new testers right now."
    NotAccepting,
    /// Neither known status was found; a slot may be free
    Open,
    /// The page could not be fetched
    Unknown,
}

/// What happened to one target during a cycle.
#[derive(Debug, Clone, Serialize)]
pub enum CheckResult {
    /// Page says no slots are available.
    Closed {
        signal: AvailabilitySignal,
        status: String,
    },
    /// Page looks open; a token was issued and a notification attempted.
    Open {
        status: String,
        token: String,
        notified: bool,
    },
    /// Page looks open, but the cycle was a dry run: no token, no notification.
    Available { status: String },
    /// Fetch failed.
    Failed { error: String },
}

/// Result line for one target.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub target: Target,
    pub result: CheckResult,
}

impl CheckOutcome {
    pub fn signal(&self) -> AvailabilitySignal {
        match &self.result {
            CheckResult::Closed { signal, .. } => *signal,
            CheckResult::Open { .. } | CheckResult::Available { .. } => AvailabilitySignal::Open,
            CheckResult::Failed { .. } => AvailabilitySignal::Unknown,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.result, CheckResult::Failed { .. })
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.target.name;
        match &self.result {
            CheckResult::Closed {
                signal: AvailabilitySignal::Full,
                ..
            } => write!(f, "❌ {name}: Beta test is full."),
            CheckResult::Closed { .. } => {
                write!(f, "❌ {name}: Beta is not accepting new testers.")
            }
            CheckResult::Open {
                status,
                notified: true,
                ..
            } => write!(
                f,
                "✅ {name}: Beta test is available! Notification sent. (Status: {status})"
            ),
            CheckResult::Open { status, .. } => write!(
                f,
                "⚠️ {name}: Beta test is available, but the notification failed. (Status: {status})"
            ),
            CheckResult::Available { status } => write!(
                f,
                "🔎 {name}: Beta test looks available, would notify. (Status: {status})"
            ),
            CheckResult::Failed { error } => {
                write!(f, "❌ Error retrieving page for {name}: {error}")
            }
        }
    }
}

/// Batch result of one poll cycle, one outcome per target in registry order.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CheckOutcome>,
}

impl CycleReport {
    pub fn open_count(&self) -> usize {
        self.count(AvailabilitySignal::Open)
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn closed_count(&self) -> usize {
        self.count(AvailabilitySignal::Full) + self.count(AvailabilitySignal::NotAccepting)
    }

    fn count(&self, signal: AvailabilitySignal) -> usize {
        self.outcomes.iter().filter(|o| o.signal() == signal).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(result: CheckResult) -> CheckOutcome {
        CheckOutcome {
            target: Target::new("AppA", "https://testflight.apple.com/join/AAAA"),
            result,
        }
    }

    #[test]
    fn test_display_lines() {
        let full = outcome(CheckResult::Closed {
            signal: AvailabilitySignal::Full,
            status: "This beta is full.".to_string(),
        });
        assert_eq!(full.to_string(), "❌ AppA: Beta test is full.");

        let failed = outcome(CheckResult::Failed {
            error: "timeout".to_string(),
        });
        assert_eq!(
            failed.to_string(),
            "❌ Error retrieving page for AppA: timeout"
        );
        assert_eq!(failed.signal(), AvailabilitySignal::Unknown);

        let available = outcome(CheckResult::Available {
            status: "Open".to_string(),
        });
        assert_eq!(
            available.to_string(),
            "🔎 AppA: Beta test looks available, would notify. (Status: Open)"
        );
        assert_eq!(available.signal(), AvailabilitySignal::Open);
    }

    #[test]
    fn test_report_counts() {
        let now = Utc::now();
        let report = CycleReport {
            started_at: now,
            finished_at: now,
            outcomes: vec![
                outcome(CheckResult::Closed {
                    signal: AvailabilitySignal::NotAccepting,
                    status: String::new(),
                }),
                outcome(CheckResult::Open {
                    status: String::new(),
                    token: "abc123".to_string(),
                    notified: false,
                }),
                outcome(CheckResult::Failed {
                    error: "boom".to_string(),
                }),
            ],
        };

        assert_eq!(report.closed_count(), 1);
        assert_eq!(report.open_count(), 1);
        assert_eq!(report.failure_count(), 1);
    }
}
