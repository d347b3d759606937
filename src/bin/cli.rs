//! TestFlight beta watcher CLI
//!
//! Polls the configured TestFlight pages and serves the one-click removal
//! links sent inside notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use beta_watcher::{
    error::{AppError, Result},
    models::{Config, Target, normalize_target_url},
    pipeline::{WatchSettings, Watcher, log_report},
    server::{self, AppState},
    services::{NotifyOptions, Notifier, PushoverNotifier, StatusClassifier, TargetRegistry, TokenService},
    storage::{ConfigStore, LocalConfigStore},
    utils::http::{self, HttpFetcher},
};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;

/// TestFlight Watcher - get notified when a beta opens up
#[derive(Parser, Debug)]
#[command(name = "beta-watcher", version, about = "TestFlight beta slot watcher")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "storage/config.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll on the configured interval and serve removal links
    Run,

    /// Check every target once and print the report (dry run: no
    /// tokens are issued and no notifications are sent)
    Check,

    /// Watch a new TestFlight page. A running `run` process keeps its own
    /// target list; restart it afterwards or its next removal overwrites
    /// this change.
    Add {
        /// Display name for notifications
        #[arg(short, long)]
        name: String,

        /// Full URL or bare invite code
        target: String,
    },

    /// Stop watching a page. Restart a running `run` process afterwards.
    Remove {
        /// Target URL exactly as listed
        url: String,
    },

    /// List watched pages
    List,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Everything the watcher and the server share.
struct Runtime {
    config: Config,
    registry: Arc<TargetRegistry>,
    fetcher: Arc<HttpFetcher>,
    notifier: Arc<PushoverNotifier>,
}

impl Runtime {
    async fn load(path: &Path) -> Result<Self> {
        let store = Arc::new(LocalConfigStore::new(path));
        let table = store.read().await?;
        let mut config = Config::from_table(table)?;
        config.apply_env_overrides();
        log::info!("Loaded configuration from {}", store.path().display());

        let client = http::create_async_client(&config.watcher)?;
        let fetcher = Arc::new(HttpFetcher::new(client.clone()));
        let notifier = Arc::new(PushoverNotifier::new(client, &config.pushover));
        let registry = Arc::new(TargetRegistry::load(store).await?);

        Ok(Self {
            config,
            registry,
            fetcher,
            notifier,
        })
    }

    fn watcher(&self, tokens: Arc<TokenService>, dry_run: bool) -> Result<Watcher> {
        let settings = WatchSettings {
            dry_run,
            ..WatchSettings::from_config(&self.config)
        };
        Ok(Watcher::new(
            Arc::clone(&self.registry),
            tokens,
            self.fetcher.clone(),
            self.notifier.clone(),
            StatusClassifier::new()?,
            settings,
        ))
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.config.uses_default_secret() {
            log::warn!("otp.secret is still the default; removal links are forgeable");
        }
        Ok(())
    }

    async fn announce(&self, title: &str, message: &str) {
        let options = NotifyOptions::from_config(&self.config.pushover);
        if !self.notifier.send(title, message, &options).await {
            log::warn!("Confirmation notification was not delivered");
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = Runtime::load(&cli.config).await?;

    match cli.command {
        Command::Run => {
            runtime.validate()?;
            if runtime.registry.is_empty().await {
                log::warn!("No targets configured; add one with `beta-watcher add`");
            }
            log::info!("Restart after `add` or `remove`; link removals rewrite the whole target list");

            let tokens = Arc::new(TokenService::from_config(&runtime.config.otp)?);
            let watcher = runtime.watcher(Arc::clone(&tokens), false)?;
            let state = AppState {
                tokens,
                registry: Arc::clone(&runtime.registry),
            };

            // Target list changes are persisted already; a supervisor that
            // wants a clean restart can key off this log line.
            let mut changes = runtime.registry.subscribe();
            tokio::spawn(async move {
                while changes.changed().await.is_ok() {
                    let generation = *changes.borrow_and_update();
                    log::info!("Watched targets changed (generation {generation}); reload requested");
                }
            });

            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let addr = runtime.config.server.socket_addr()?;
            let server_task = tokio::spawn(server::serve(addr, state, async move {
                let _ = stop_rx.await;
            }));

            watcher
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                    log::info!("Shutdown requested");
                })
                .await;

            let _ = stop_tx.send(());
            server_task
                .await
                .map_err(|e| AppError::config(format!("server task failed: {e}")))??;
        }

        Command::Check => {
            let tokens = Arc::new(TokenService::from_config(&runtime.config.otp)?);
            // Nothing serves removal links from a one-shot process.
            let report = runtime.watcher(tokens, true)?.run_cycle().await;
            log_report(&report);
        }

        Command::Add { name, target } => {
            let url = normalize_target_url(&target)?;
            runtime
                .registry
                .add(Target::new(&name, &url), runtime.fetcher.as_ref())
                .await?;
            runtime
                .announce(
                    "🆕 TestFlight URL added",
                    &format!("Now watching the TestFlight beta for {name}.\n\nURL: {url}"),
                )
                .await;
        }

        Command::Remove { url } => match runtime.registry.remove(&url).await? {
            Some(removed) => {
                runtime
                    .announce(
                        "🗑️ TestFlight URL removed",
                        &format!(
                            "No longer watching the TestFlight beta for {}.\n\nURL: {}",
                            removed.name, removed.url
                        ),
                    )
                    .await;
            }
            None => log::warn!("{url} is not being watched"),
        },

        Command::List => {
            let targets = runtime.registry.snapshot().await;
            if targets.is_empty() {
                log::info!("No targets configured.");
            }
            for (i, target) in targets.iter().enumerate() {
                log::info!("{}. {} - {}", i + 1, target.name, target.url);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = runtime.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} targets)",
                runtime.registry.len().await
            );
        }
    }

    Ok(())
}
