//! Validity predicate for fetched bodies.
//!
//! A body is real content when it is long enough, carries no bot-trap or
//! protection-challenge marker, and looks like an HTML document. All
//! matching is case-insensitive substring matching.

use serde::Serialize;

/// Placeholder phrases served to automated clients instead of the page.
pub const BOT_TRAP_MARKERS: &[&str] = &[
    "this is a trap for bots",
    "content loading...",
    "loading...",
    "please wait...",
    "you are being redirected",
    "<body></body>",
];

/// Markers of the AES-based JavaScript challenge some free hosts inject.
pub const CHALLENGE_MARKERS: &[&str] = &["aes.js", "slowaes.decrypt"];

/// Markers of an HTML document root.
pub const HTML_ROOT_MARKERS: &[&str] = &["<!doctype", "<html", "<body"];

/// Default minimum trimmed length for accepted content.
pub const DEFAULT_MIN_LENGTH: usize = 100;

/// Classification of a fetched body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Empty,
    TooShort { length: usize, minimum: usize },
    BotTrap { marker: &'static str },
    Challenge { marker: &'static str },
    NotHtml,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Valid => write!(f, "valid"),
            Verdict::Empty => write!(f, "empty body"),
            Verdict::TooShort { length, minimum } => {
                write!(f, "too short ({length} < {minimum} chars)")
            }
            Verdict::BotTrap { marker } => write!(f, "bot trap ({marker:?})"),
            Verdict::Challenge { marker } => write!(f, "protection challenge ({marker:?})"),
            Verdict::NotHtml => write!(f, "no html root marker"),
        }
    }
}

/// Validity predicate with a configurable minimum length.
#[derive(Debug, Clone, Copy)]
pub struct ContentValidator {
    min_length: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH)
    }
}

impl ContentValidator {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Classify a body. Checks run in order: length, traps, challenge, root.
    pub fn classify(&self, body: &str) -> Verdict {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Verdict::Empty;
        }

        let length = trimmed.chars().count();
        if length < self.min_length {
            return Verdict::TooShort {
                length,
                minimum: self.min_length,
            };
        }

        let lower = trimmed.to_lowercase();
        if let Some(marker) = find_marker(&lower, BOT_TRAP_MARKERS) {
            return Verdict::BotTrap { marker };
        }
        if let Some(marker) = find_marker(&lower, CHALLENGE_MARKERS) {
            return Verdict::Challenge { marker };
        }
        if find_marker(&lower, HTML_ROOT_MARKERS).is_none() {
            return Verdict::NotHtml;
        }

        Verdict::Valid
    }

    pub fn is_valid_content(&self, body: &str) -> bool {
        self.classify(body).is_valid()
    }
}

/// Validity check with the default minimum length.
pub fn is_valid_content(body: &str) -> bool {
    ContentValidator::default().is_valid_content(body)
}

/// Whether the body carries a protection-challenge marker.
pub fn has_challenge_marker(body: &str) -> bool {
    find_marker(&body.to_lowercase(), CHALLENGE_MARKERS).is_some()
}

/// Whether the body carries a bot-trap marker.
pub fn has_bot_trap_marker(body: &str) -> bool {
    find_marker(&body.to_lowercase(), BOT_TRAP_MARKERS).is_some()
}

fn find_marker(lower: &str, markers: &[&'static str]) -> Option<&'static str> {
    markers.iter().copied().find(|m| lower.contains(m))
}
