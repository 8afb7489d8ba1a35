//! Error types for answer resolution and content storage
//!
//! Neither family ever escapes its component: resolver errors end in the
//! deterministic fallback, store errors end in a log line.

use thiserror::Error;

/// Errors that can occur while fetching the answer from remote endpoints
#[derive(Error, Debug)]
pub enum ResolveError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Single request exceeded its timeout
    #[error("Request timeout")]
    Timeout,

    /// Body was not JSON or carried no usable word
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// UTC offset (in minutes) outside what a fixed offset can hold
    #[error("UTC offset out of range: {0} minutes")]
    InvalidOffset(i32),

    /// No endpoints configured
    #[error("No answer endpoints configured")]
    NoEndpoints,

    /// Every attempt in the retry budget failed
    #[error("All {attempts} endpoint attempts failed (last error: {last_error})")]
    Exhausted { attempts: u32, last_error: String },
}

impl ResolveError {
    /// Whether another endpoint might succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::ServerError(_) | Self::Timeout | Self::Decode(_)
        )
    }
}

/// Errors from the durable snapshot backing the content store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("Snapshot I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be (de)serialized
    #[error("Snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Secondary mirror rejected the snapshot
    #[error("Mirror failed: {0}")]
    Mirror(String),
}

impl StoreError {
    /// Create an I/O error tagged with the path involved
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
