//! Watched target data structure.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Base URL that bare TestFlight invite codes are expanded against.
pub const TESTFLIGHT_JOIN_URL: &str = "https://testflight.apple.com/join/";

/// One watched signup page. The URL is the identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    /// Display name used in reports and notifications
    pub name: String,

    /// Signup page URL
    pub url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Turn operator input into a target URL.
///
/// Full `http(s)` URLs are kept as typed; a bare invite code such as
/// `AbC123` becomes `https://testflight.apple.com/join/AbC123`.
pub fn normalize_target_url(input: &str) -> Result<String> {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        url::Url::parse(input)?;
        return Ok(input.to_string());
    }

    let code = Regex::new(r"^[A-Za-z0-9]+$").map_err(|e| AppError::config(e.to_string()))?;
    if code.is_match(input) {
        Ok(format!("{TESTFLIGHT_JOIN_URL}{input}"))
    } else {
        Err(AppError::validation(format!(
            "'{input}' is neither a URL nor a TestFlight invite code"
        )))
    }
}
