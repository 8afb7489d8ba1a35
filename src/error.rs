//! Errors that cross the HTTP boundary
//!
//! Components keep their own error families: the resolver turns failures
//! into a fallback answer and the store turns them into log lines. What a
//! handler can still fail with is collected in [`Error`], whose
//! [`ErrorCategory`] picks the status code and whose recoverability tells
//! the caller whether retrying makes sense.

use thiserror::Error;

pub use crate::scheduler::error::SchedulerError;

/// Common interface for errors reported to API callers
pub trait WorddayErrorTrait: std::error::Error {
    /// Whether the same request may succeed if retried
    fn is_recoverable(&self) -> bool;

    /// Classification used to pick a response status
    fn category(&self) -> ErrorCategory;

    /// One-line description prefixed with the category
    fn describe(&self) -> String {
        format!("{}: {}", self.category().as_str(), self)
    }
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller sent something unusable
    InvalidInput,
    /// Requested resource does not exist
    NotFound,
    /// Configuration rejected by validation
    Config,
    /// Server-side failure
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid input",
            Self::NotFound => "not found",
            Self::Config => "configuration error",
            Self::Internal => "internal error",
        }
    }
}

/// Error returned by API handlers
#[derive(Error, Debug)]
pub enum Error {
    /// Operator input or scheduler failure
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Request body was not valid JSON for the endpoint
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// Lookup by id found nothing
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Anything else, already rendered with its context chain
    #[error("{0}")]
    Other(String),
}

impl WorddayErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_recoverable(),
            Self::InvalidBody(_) | Self::NotFound { .. } => false,
            Self::Other(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(SchedulerError::InvalidWord { .. }) | Self::InvalidBody(_) => {
                ErrorCategory::InvalidInput
            }
            Self::Scheduler(
                SchedulerError::InvalidDailyTime { .. }
                | SchedulerError::InvalidInterval { .. }
                | SchedulerError::ConfigError { .. },
            ) => ErrorCategory::Config,
            Self::Scheduler(SchedulerError::GenerationFailed { .. }) | Self::Other(_) => {
                ErrorCategory::Internal
            }
            Self::NotFound { .. } => ErrorCategory::NotFound,
        }
    }
}

impl Error {
    /// Create a not-found error for a kind of resource
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Result type alias using the handler Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::from(SchedulerError::invalid_word("xyz"));
        assert_eq!(err.category(), ErrorCategory::InvalidInput);

        let err = Error::from(SchedulerError::invalid_daily_time("25:00"));
        assert_eq!(err.category(), ErrorCategory::Config);

        let err = Error::not_found("Article", "deadbeef");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "Article not found: deadbeef");
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::from(SchedulerError::generation_failed("empty")).is_recoverable());
        assert!(!Error::from(SchedulerError::invalid_word("toolong")).is_recoverable());

        let body = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert!(!Error::from(body).is_recoverable());
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let unified: Error = anyhow::anyhow!("outer").context("wrapped").into();
        assert_eq!(unified.to_string(), "wrapped: outer");
        assert_eq!(unified.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_describe() {
        let err = Error::from(SchedulerError::invalid_word("toolong"));
        assert_eq!(
            err.describe(),
            "invalid input: Invalid word 'toolong'. Expected five ASCII letters"
        );
    }
}
