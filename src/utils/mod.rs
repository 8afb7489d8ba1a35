//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod clock;
pub mod error;

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub use clock::{Clock, ManualClock, SystemClock};

/// Length of a puzzle answer
pub const WORD_LENGTH: usize = 5;

/// Normalize a raw answer into upper-case ASCII, rejecting anything that is
/// not exactly five letters
pub fn normalize_word(raw: &str) -> Option<String> {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();

    let re = WORD_RE.get_or_init(|| {
        Regex::new(&format!(r"^[A-Za-z]{{{WORD_LENGTH}}}$")).expect("Invalid regex pattern")
    });

    let trimmed = raw.trim();
    if re.is_match(trimmed) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

/// Store key for a word (content is indexed case-insensitively)
pub fn normalize_key(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = Url::parse(url).context("Invalid URL")?;

    parsed
        .host_str()
        .map(|s| s.to_string())
        .context("No host in URL")
}

/// Truncate text to a maximum length (in characters)
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
