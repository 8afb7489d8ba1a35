//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
///
/// Only configuration and operator input can fail; job bodies log their
/// problems instead of returning them.
#[derive(Debug)]
pub enum SchedulerError {
    /// Daily time is not a valid HH:MM value
    InvalidDailyTime { value: String },

    /// An interval is zero or too large
    InvalidInterval { field: String, reason: String },

    /// Any other configuration problem
    ConfigError { field: String, reason: String },

    /// Operator supplied a word that is not five letters
    InvalidWord { word: String },

    /// A generation produced nothing to store
    GenerationFailed { reason: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDailyTime { value } => {
                write!(f, "Invalid daily time '{}'. Expected HH:MM", value)
            }
            Self::InvalidInterval { field, reason } => {
                write!(f, "Invalid interval '{}': {}", field, reason)
            }
            Self::ConfigError { field, reason } => {
                write!(f, "Scheduler config error in '{}': {}", field, reason)
            }
            Self::InvalidWord { word } => {
                write!(f, "Invalid word '{}'. Expected five ASCII letters", word)
            }
            Self::GenerationFailed { reason } => {
                write!(f, "Generation failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid daily time error
    pub fn invalid_daily_time(value: impl Into<String>) -> Self {
        Self::InvalidDailyTime {
            value: value.into(),
        }
    }

    /// Create an invalid interval error
    pub fn invalid_interval(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid word error
    pub fn invalid_word(word: impl Into<String>) -> Self {
        Self::InvalidWord { word: word.into() }
    }

    /// Create a generation failure
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::GenerationFailed {
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }
}
