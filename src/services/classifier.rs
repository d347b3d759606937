// src/services/classifier.rs

//! Maps a fetched signup page to an availability signal.

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::AvailabilitySignal;

/// CSS selector for the status line on a TestFlight join page.
pub const STATUS_SELECTOR: &str = "div.beta-status span";

const FULL: &str = "This beta is full.";
const NOT_ACCEPTING: &str = "This beta isn't accepting any new testers right now.";

/// Signal plus the status text it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub signal: AvailabilitySignal,
    pub status: String,
}

/// Status classifier for signup pages.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    selector: Selector,
}

impl StatusClassifier {
    pub fn new() -> Result<Self> {
        Self::with_selector(STATUS_SELECTOR)
    }

    pub fn with_selector(selector: &str) -> Result<Self> {
        let selector = Selector::parse(selector)
            .map_err(|e| AppError::config(format!("invalid selector '{selector}': {e:?}")))?;
        Ok(Self { selector })
    }

    /// Classify page markup.
    ///
    /// The text of every matching element is joined and compared exactly
    /// against the two known closed messages. Anything else, including a page
    /// with no status element at all, counts as open.
    pub fn classify(&self, html: &str) -> Classification {
        let document = Html::parse_document(html);
        let text: String = document
            .select(&self.selector)
            .flat_map(|el| el.text())
            .collect();
        let status = normalize_whitespace(&text);

        let signal = match status.replace('\u{2019}', "'").as_str() {
            FULL => AvailabilitySignal::Full,
            NOT_ACCEPTING => AvailabilitySignal::NotAccepting,
            _ => AvailabilitySignal::Open,
        };

        Classification { signal, status }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
