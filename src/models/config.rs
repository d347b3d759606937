//! Application configuration structures.

use std::collections::HashSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Target;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Polling and fetch behavior
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// One-time token settings
    #[serde(default)]
    pub otp: OtpConfig,

    /// Push notification transport
    #[serde(default)]
    pub pushover: PushoverConfig,

    /// Revocation link server
    #[serde(default)]
    pub server: ServerConfig,

    /// Watched signup pages
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Config {
    /// Build configuration from an already parsed key/value table.
    pub fn from_table(table: toml::Table) -> Result<Self> {
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Override secrets and the public URL from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("OTP_SECRET") {
            self.otp.secret = secret;
        }
        if let Ok(user_key) = std::env::var("PUSHOVER_USER_KEY") {
            self.pushover.user_key = user_key;
        }
        if let Ok(app_token) = std::env::var("PUSHOVER_APP_TOKEN") {
            self.pushover.app_token = app_token;
        }
        if let Ok(public_url) = std::env::var("PUBLIC_URL") {
            self.server.public_url = public_url;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.watcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("watcher.user_agent is empty"));
        }
        if self.watcher.check_interval_secs == 0 {
            return Err(AppError::validation(
                "watcher.check_interval_secs must be > 0",
            ));
        }
        if self.watcher.timeout_secs == 0 {
            return Err(AppError::validation("watcher.timeout_secs must be > 0"));
        }
        if self.otp.secret.is_empty() {
            return Err(AppError::validation("otp.secret is empty"));
        }
        if self.otp.validity_minutes == 0 {
            return Err(AppError::validation("otp.validity_minutes must be > 0"));
        }
        if self.pushover.user_key.trim().is_empty() || self.pushover.app_token.trim().is_empty() {
            return Err(AppError::validation(
                "pushover.user_key and pushover.app_token are required",
            ));
        }
        self.server.socket_addr()?;
        url::Url::parse(&self.server.public_url)
            .map_err(|e| AppError::validation(format!("server.public_url: {e}")))?;

        let mut seen = HashSet::new();
        for target in &self.targets {
            url::Url::parse(&target.url).map_err(|e| {
                AppError::validation(format!("target {} has invalid url: {e}", target.name))
            })?;
            if !seen.insert(target.url.as_str()) {
                return Err(AppError::validation(format!(
                    "target url listed twice: {}",
                    target.url
                )));
            }
        }
        Ok(())
    }

    /// Whether the HMAC secret was left at its shipped default.
    pub fn uses_default_secret(&self) -> bool {
        self.otp.secret == defaults::secret()
    }
}

/// Polling and fetch behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// User-Agent header for page fetches
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Seconds between poll cycles
    #[serde(default = "defaults::check_interval")]
    pub check_interval_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            check_interval_secs: defaults::check_interval(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// One-time token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// HMAC key
    #[serde(default = "defaults::secret")]
    pub secret: String,

    /// Length of one token window in minutes
    #[serde(default = "defaults::validity_minutes")]
    pub validity_minutes: u64,
}

impl OtpConfig {
    /// Window length in milliseconds.
    pub fn validity_ms(&self) -> u64 {
        self.validity_minutes.saturating_mul(60_000)
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            secret: defaults::secret(),
            validity_minutes: defaults::validity_minutes(),
        }
    }
}

/// Pushover credentials and message options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushoverConfig {
    #[serde(default)]
    pub user_key: String,

    #[serde(default)]
    pub app_token: String,

    /// Accepts a name (`high`) or a level (`1`)
    #[serde(default = "defaults::priority")]
    pub priority: Priority,

    #[serde(default = "defaults::sound")]
    pub sound: String,
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            user_key: String::new(),
            app_token: String::new(),
            priority: defaults::priority(),
            sound: defaults::sound(),
        }
    }
}

/// Revocation link server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:3000`
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Externally reachable base URL used in revocation links
    #[serde(default = "defaults::public_url")]
    pub public_url: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| AppError::validation(format!("server.bind '{}': {e}", self.bind)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            public_url: defaults::public_url(),
        }
    }
}

/// Notification priority levels understood by the push transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawPriority", into = "String")]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

impl Priority {
    /// Numeric level sent on the wire.
    pub fn level(self) -> i8 {
        match self {
            Priority::Lowest => -2,
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Emergency => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Lowest => "lowest",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Emergency => "emergency",
        }
    }

    fn from_level(level: i64) -> Self {
        match level {
            -2 => Priority::Lowest,
            -1 => Priority::Low,
            1 => Priority::High,
            2 => Priority::Emergency,
            _ => Priority::Normal,
        }
    }

    fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "lowest" => Priority::Lowest,
            "low" => Priority::Low,
            "high" => Priority::High,
            "emergency" => Priority::Emergency,
            other => other
                .parse::<i64>()
                .map(Self::from_level)
                .unwrap_or(Priority::Normal),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriority {
    Level(i64),
    Name(String),
}

impl From<RawPriority> for Priority {
    fn from(raw: RawPriority) -> Self {
        match raw {
            RawPriority::Level(level) => Priority::from_level(level),
            RawPriority::Name(name) => Priority::from_name(&name),
        }
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        priority.as_str().to_string()
    }
}

mod defaults {
    use super::Priority;

    // Watcher defaults
    pub fn user_agent() -> String {
        "TestFlight-Watcher/1.0 (Monitoring Script)".into()
    }
    pub fn check_interval() -> u64 {
        30
    }
    pub fn timeout() -> u64 {
        10
    }

    // Token defaults
    pub fn secret() -> String {
        "ChangeThisString".into()
    }
    pub fn validity_minutes() -> u64 {
        5
    }

    // Pushover defaults
    pub fn priority() -> Priority {
        Priority::High
    }
    pub fn sound() -> String {
        "pushover".into()
    }

    // Server defaults
    pub fn bind() -> String {
        "0.0.0.0:3000".into()
    }
    pub fn public_url() -> String {
        "http://localhost:3000".into()
    }
}
