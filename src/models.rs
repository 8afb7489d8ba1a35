// Core data structures for the daily answer engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::utils::normalize_key;

/// The resolved answer for one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Upper-case five letter answer
    pub word: String,
    /// Days since the first puzzle (derived from `date`)
    pub sequence_number: i64,
    /// Calendar date this answer belongs to
    pub date: NaiveDate,
    /// Endpoint host, "fallback" or "manual"
    pub source: String,
    /// True when the word came from a live source rather than the offline list
    pub is_authoritative: bool,
}

impl AnswerRecord {
    /// Store key for content generated from this answer
    pub fn key(&self) -> String {
        normalize_key(&self.word)
    }
}

/// Kinds of generated article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentCategory {
    Hints,
    Answer,
    WordAnalysis,
}

impl ContentCategory {
    /// Get all categories
    pub fn all() -> [Self; 3] {
        [Self::Hints, Self::Answer, Self::WordAnalysis]
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hints => "hints",
            Self::Answer => "answer",
            Self::WordAnalysis => "word-analysis",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hints" => Ok(Self::Hints),
            "answer" => Ok(Self::Answer),
            "word-analysis" | "analysis" => Ok(Self::WordAnalysis),
            other => Err(format!("unknown content category: {other}")),
        }
    }
}

/// One generated article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Stable id derived from (key, category)
    pub id: String,
    /// Lower-cased answer word
    pub key: String,
    pub category: String,
    pub title: String,
    pub excerpt: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Rendered body, opaque to the store
    pub body: String,
    /// 0..=100
    pub quality_score: u8,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
}

impl ContentItem {
    /// Create a fresh item stamped at `now`
    pub fn new(
        word: &str,
        category: &str,
        title: impl Into<String>,
        excerpt: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let key = normalize_key(word);
        Self {
            id: item_id(&key, category),
            key,
            category: category.to_string(),
            title: title.into(),
            excerpt: excerpt.into(),
            tags: BTreeSet::new(),
            body: body.into(),
            quality_score: 0,
            published_at: now,
            updated_at: now,
            view_count: 0,
            like_count: 0,
        }
    }

    /// Attach tags (lower-cased)
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|t| t.as_ref().to_lowercase()));
        self
    }

    /// Set the quality score, clamped to 100
    pub fn with_quality_score(mut self, score: u8) -> Self {
        self.quality_score = score.min(100);
        self
    }

    /// Case-insensitive substring match over title, excerpt and tags
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.excerpt.to_lowercase().contains(needle_lower)
            || self.tags.iter().any(|t| t.contains(needle_lower))
    }
}

/// Deterministic item id: first 16 hex chars of SHA256("{key}:{category}")
pub fn item_id(key: &str, category: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b":");
    hasher.update(category.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
