//! Error types for daybook.

use thiserror::Error;

/// Errors that can occur in daybook operations.
///
/// Per-record import problems are not errors: they are collected into
/// [`ImportResult::errors`](crate::import::ImportResult) and the rest of the
/// batch carries on.
#[derive(Error, Debug)]
pub enum DaybookError {
    #[error("Invalid recurrence for event '{event_id}': {reason}")]
    InvalidRecurrence { event_id: String, reason: String },

    #[error("Recurrence for event '{event_id}' exceeds {limit} occurrences")]
    RecurrenceTooLong { event_id: String, limit: usize },

    #[error("Invalid time '{0}'. Expected HH:mm")]
    InvalidTime(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Import parse error: {0}")]
    ImportParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for daybook operations.
pub type DaybookResult<T> = Result<T, DaybookError>;
