//! Network attachment records and their acknowledgement expiry timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::errors::AttachmentError;

use super::status::AttachmentStatus;

/// A network-interface attachment with its own acknowledgement deadline.
///
/// The control plane stops accepting an attachment state change after
/// `expires_at`. The expiry timer and the submission path both set the
/// `sent` flag; the write is idempotent-true, so the race is harmless.
#[derive(Debug)]
pub struct Attachment {
    arn: String,
    task_arn: String,
    status: AttachmentStatus,
    expires_at: DateTime<Utc>,
    /// Shared with the expiry timer task.
    sent: Arc<AtomicBool>,
}

impl Attachment {
    pub fn new(
        arn: impl Into<String>,
        task_arn: impl Into<String>,
        status: AttachmentStatus,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            arn: arn.into(),
            task_arn: task_arn.into(),
            status,
            expires_at,
            sent: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub fn task_arn(&self) -> &str {
        &self.task_arn
    }

    pub fn status(&self) -> AttachmentStatus {
        self.status
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }

    pub fn mark_sent(&self) {
        self.sent.store(true, Ordering::Release);
    }

    pub fn has_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Start the expiry timer for this attachment.
    ///
    /// When the deadline passes before the change was submitted, the timer
    /// marks the attachment sent so the reporting pipeline stops trying.
    /// Errors if the attachment has already expired.
    pub fn start_expiry_timer(&self, cancel: &CancellationToken) -> Result<(), AttachmentError> {
        let now = Utc::now();
        let remaining = (self.expires_at - now)
            .to_std()
            .map_err(|_| AttachmentError::AlreadyExpired {
                arn: self.arn.clone(),
                expires_at: self.expires_at,
            })?;

        let sent = Arc::clone(&self.sent);
        let arn = self.arn.clone();
        let task_arn = self.task_arn.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep(remaining) => {
                    if !sent.swap(true, Ordering::AcqRel) {
                        warn!(
                            attachment_arn = %arn,
                            task_arn = %task_arn,
                            "attachment expired before its state change was acknowledged"
                        );
                    }
                }
            }
        });
        Ok(())
    }
}
