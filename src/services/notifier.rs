// src/services/notifier.rs

//! Push notification delivery.

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Priority, PushoverConfig};

/// Pushover message endpoint.
pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

// Emergency messages repeat until acknowledged; the transport requires both.
const EMERGENCY_RETRY_SECS: u32 = 60;
const EMERGENCY_EXPIRE_SECS: u32 = 3600;

/// Per-message delivery options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    pub priority: Priority,
    /// `None` lets the transport pick its default sound
    pub sound: Option<String>,
}

impl NotifyOptions {
    pub fn from_config(config: &PushoverConfig) -> Self {
        let sound = config.sound.trim();
        Self {
            priority: config.priority,
            sound: (!sound.is_empty()).then(|| sound.to_string()),
        }
    }
}

/// Delivers human-readable messages. Never fails loudly: delivery problems
/// are logged and reported as `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, title: &str, message: &str, options: &NotifyOptions) -> bool;
}

#[derive(Debug, Default, Deserialize)]
struct PushoverReply {
    #[serde(default)]
    errors: Vec<String>,
}

/// Pushover-backed notifier.
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    client: reqwest::Client,
    user_key: String,
    app_token: String,
    endpoint: String,
}

impl PushoverNotifier {
    pub fn new(client: reqwest::Client, config: &PushoverConfig) -> Self {
        Self {
            client,
            user_key: config.user_key.clone(),
            app_token: config.app_token.clone(),
            endpoint: PUSHOVER_ENDPOINT.to_string(),
        }
    }

    /// Point the notifier at a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn form(&self, title: &str, message: &str, options: &NotifyOptions) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("token", self.app_token.clone()),
            ("user", self.user_key.clone()),
            ("title", title.to_string()),
            ("message", message.to_string()),
            ("priority", options.priority.level().to_string()),
        ];
        if let Some(sound) = &options.sound {
            form.push(("sound", sound.clone()));
        }
        if options.priority == Priority::Emergency {
            form.push(("retry", EMERGENCY_RETRY_SECS.to_string()));
            form.push(("expire", EMERGENCY_EXPIRE_SECS.to_string()));
        }
        form
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, title: &str, message: &str, options: &NotifyOptions) -> bool {
        if self.user_key.trim().is_empty() || self.app_token.trim().is_empty() {
            log::error!("Notification not sent: Pushover credentials are missing");
            return false;
        }

        let form = self.form(title, message, options);
        let response = match self.client.post(&self.endpoint).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Notification request failed: {e}");
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            log::info!("Notification sent: {title}");
            return true;
        }

        let body = response.text().await.unwrap_or_default();
        let reply: PushoverReply = serde_json::from_str(&body).unwrap_or_default();
        if reply.errors.is_empty() {
            log::error!("Notification rejected with status {status}");
        } else {
            log::error!(
                "Notification rejected with status {status}: {}",
                reply.errors.join("; ")
            );
        }
        false
    }
}
