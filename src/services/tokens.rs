// src/services/tokens.rs

//! One-time tokens for the unauthenticated removal link.
//!
//! A token is the first six hex characters of
//! `HMAC-SHA256(secret, "{window}-{target_url}")`, where `window` is the
//! current wall-clock time in milliseconds divided by the validity length.
//! Tokens are therefore deterministic within a window and stop verifying as
//! soon as the window rolls over, regardless of when they were issued.
//!
//! At most one token is pending per target. Issuing overwrites the previous
//! entry; a successful verification deletes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::OtpConfig;

type HmacSha256 = Hmac<Sha256>;

/// Number of hex characters kept from the MAC.
pub const TOKEN_LEN: usize = 6;

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// System time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Issues and verifies window-bound, single-use tokens.
pub struct TokenService {
    mac: HmacSha256,
    validity_ms: u64,
    clock: Arc<dyn Clock>,
    pending: Mutex<HashMap<String, String>>,
}

impl TokenService {
    /// Create a service on the system clock.
    pub fn new(secret: impl AsRef<[u8]>, validity_ms: u64) -> Result<Self> {
        Self::with_clock(secret, validity_ms, Arc::new(SystemClock))
    }

    /// Create a service on a caller-supplied clock.
    pub fn with_clock(
        secret: impl AsRef<[u8]>,
        validity_ms: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if validity_ms == 0 {
            return Err(AppError::config("token validity must be > 0"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| AppError::config(format!("invalid token secret: {e}")))?;

        Ok(Self {
            mac,
            validity_ms,
            clock,
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &OtpConfig) -> Result<Self> {
        Self::new(config.secret.as_bytes(), config.validity_ms())
    }

    /// Index of the window the clock currently falls in.
    pub fn current_window(&self) -> u64 {
        self.clock.now_ms() / self.validity_ms
    }

    /// Issue a token for `key`, replacing any token still pending for it.
    pub fn issue(&self, key: &str) -> String {
        let token = self.compute(self.current_window(), key);
        self.pending().insert(key.to_string(), token.clone());
        log::debug!("Issued token for {key}");
        token
    }

    /// Check `token` against the current window and the pending entry for `key`.
    ///
    /// Consumes the pending entry on success. A failed check leaves it alone.
    pub fn verify(&self, token: &str, key: &str) -> bool {
        let expected = self.compute(self.current_window(), key);
        let mut pending = self.pending();

        let valid = match pending.get(key) {
            Some(stored) => {
                let fresh: bool = token.as_bytes().ct_eq(expected.as_bytes()).into();
                let current: bool = token.as_bytes().ct_eq(stored.as_bytes()).into();
                fresh && current
            }
            None => false,
        };

        if valid {
            pending.remove(key);
        }
        valid
    }

    /// Whether a token is waiting to be used for `key`.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    fn compute(&self, window: u64, key: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(format!("{window}-{key}").as_bytes());
        let mut digest = hex::encode(mac.finalize().into_bytes());
        digest.truncate(TOKEN_LEN);
        digest
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
