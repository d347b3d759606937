// src/pipeline/watch.rs

//! Poll scheduler.
//!
//! Each cycle snapshots the registry and runs fetch → classify → notify for
//! every target at once. One target failing never affects the others, and
//! the report is only produced after every pipeline has finished.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::MissedTickBehavior;

use crate::models::{AvailabilitySignal, CheckOutcome, CheckResult, Config, CycleReport, Target};
use crate::services::{NotifyOptions, Notifier, StatusClassifier, TargetRegistry, TokenService};
use crate::utils::http::Fetcher;
use crate::utils::revocation_link;

/// Scheduler settings derived from configuration.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub interval: Duration,
    pub public_url: String,
    pub notify: NotifyOptions,
    /// Classify and report only; never issue tokens or send notifications
    pub dry_run: bool,
}

impl WatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.watcher.check_interval_secs),
            public_url: config.server.public_url.clone(),
            notify: NotifyOptions::from_config(&config.pushover),
            dry_run: false,
        }
    }
}

/// Periodically checks every watched target.
pub struct Watcher {
    registry: Arc<TargetRegistry>,
    tokens: Arc<TokenService>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,
    classifier: StatusClassifier,
    settings: WatchSettings,
}

impl Watcher {
    pub fn new(
        registry: Arc<TargetRegistry>,
        tokens: Arc<TokenService>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
        classifier: StatusClassifier,
        settings: WatchSettings,
    ) -> Self {
        Self {
            registry,
            tokens,
            fetcher,
            notifier,
            classifier,
            settings,
        }
    }

    /// Run cycles on the configured interval until `shutdown` resolves.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// delays the next one instead of overlapping it; an in-flight cycle is
    /// allowed to finish before the loop exits.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        log::info!(
            "Watcher started: checking every {}s",
            self.settings.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    log_report(&report);
                }
            }
        }

        log::info!("Watcher stopped");
    }

    /// Check every target once, concurrently.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let targets = self.registry.snapshot().await;
        log::debug!("Checking {} targets", targets.len());

        let outcomes = join_all(targets.into_iter().map(|t| self.check_target(t))).await;

        CycleReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        }
    }

    async fn check_target(&self, target: Target) -> CheckOutcome {
        let result = match self.fetcher.fetch(&target.url).await {
            Ok(html) => {
                let classification = self.classifier.classify(&html);
                match classification.signal {
                    AvailabilitySignal::Open if self.settings.dry_run => {
                        log::info!("{} looks open; dry run, not notifying", target.name);
                        CheckResult::Available {
                            status: classification.status,
                        }
                    }
                    AvailabilitySignal::Open => {
                        self.announce_open(&target, classification.status).await
                    }
                    signal => CheckResult::Closed {
                        signal,
                        status: classification.status,
                    },
                }
            }
            Err(e) => {
                log::warn!("Fetch failed for {}: {e}", target.name);
                CheckResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        CheckOutcome { target, result }
    }

    // Issue a fresh token and tell the operator. The token stays issued even
    // if delivery fails.
    async fn announce_open(&self, target: &Target, status: String) -> CheckResult {
        let token = self.tokens.issue(&target.url);

        let title = format!("🎉 TestFlight beta available for {}!", target.name);
        let mut message = format!(
            "The beta test for {} is available. Sign up now! 🚀\n\n{}",
            target.name, target.url
        );
        match revocation_link(&self.settings.public_url, &token, &target.url) {
            Ok(link) => message.push_str(&format!(
                "\n\nClick this link to stop watching this beta: {link}"
            )),
            Err(e) => log::error!("Could not build removal link for {}: {e}", target.url),
        }

        let notified = self
            .notifier
            .send(&title, &message, &self.settings.notify)
            .await;
        if !notified {
            log::error!("Error sending notification for {}", target.name);
        }

        CheckResult::Open {
            status,
            token,
            notified,
        }
    }
}

/// Write a cycle report to the log, one line per target.
pub fn log_report(report: &CycleReport) {
    log::info!(
        "⏰ Check started {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for outcome in &report.outcomes {
        if outcome.is_failure() {
            log::warn!("{outcome}");
        } else {
            log::info!("{outcome}");
        }
    }
    log::info!(
        "✔️ Check completed: {} open, {} closed, {} failed",
        report.open_count(),
        report.closed_count(),
        report.failure_count()
    );
}
