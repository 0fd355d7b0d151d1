//! Domain errors surfaced across the reporting subsystem boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced to event producers.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// The event was malformed: wrong kind for the pipeline it was handed
    /// to, or a missing task ARN.
    #[error("invalid state change event: {0}")]
    InvalidEvent(String),

    /// The reporting pipeline is shutting down; the event was not accepted.
    #[error("state change reporting has been cancelled")]
    Cancelled,
}

/// Errors from attachment lifecycle handling.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment {arn} already expired at {expires_at}")]
    AlreadyExpired {
        arn: String,
        expires_at: DateTime<Utc>,
    },
}

/// Errors from the durable acknowledgement store.
///
/// Store failures never interrupt the reporting pipeline; callers log them
/// and move on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store migration failed: {0}")]
    Migration(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}
