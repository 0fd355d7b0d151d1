//! Standalone attachment state-change reporting.
//!
//! Attachments have their own acknowledgement deadline, so their changes
//! do not ride the per-task queues: each attachment gets a serialized
//! submission loop that retries under backoff until the change is
//! acknowledged, the attachment expires, or the pipeline is cancelled.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::ReporterError;
use crate::domain::models::{AttachmentStateChange, StateChange};
use crate::domain::ports::ControlPlaneClient;

use super::backoff::{Backoff, ExponentialBackoff};
use super::config::{ConfigError, ReporterConfig};

/// Reporting pipeline for standalone attachment transitions.
pub struct AttachmentReporter {
    config: ReporterConfig,
    client: Arc<dyn ControlPlaneClient>,
    /// Per-attachment serialization gates, keyed by attachment ARN.
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    cancel: CancellationToken,
    handle: Weak<AttachmentReporter>,
}

impl AttachmentReporter {
    /// Create the attachment reporter. Rejects out-of-range configuration
    /// before anything is spawned.
    pub fn new(
        config: ReporterConfig,
        client: Arc<dyn ControlPlaneClient>,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        Ok(Arc::new_cyclic(|handle| Self {
            config,
            client,
            gates: Mutex::new(HashMap::new()),
            cancel,
            handle: handle.clone(),
        }))
    }

    /// Accept one attachment state-change event and submit it in the
    /// background. Fire-and-forget: submission failures are retried until
    /// the attachment expires.
    pub async fn add_state_change_event(&self, change: StateChange) -> Result<(), ReporterError> {
        if self.cancel.is_cancelled() {
            return Err(ReporterError::Cancelled);
        }
        let StateChange::Attachment(change) = change else {
            return Err(ReporterError::InvalidEvent(format!(
                "{} state change handed to the attachment pipeline",
                change.kind()
            )));
        };
        if change.attachment.arn().is_empty() {
            return Err(ReporterError::InvalidEvent(
                "attachment state change without an attachment ARN".into(),
            ));
        }

        let gate = Arc::clone(
            self.gates
                .lock()
                .await
                .entry(change.attachment.arn().to_string())
                .or_default(),
        );

        let Some(reporter) = self.handle.upgrade() else {
            return Err(ReporterError::Cancelled);
        };
        tokio::spawn(async move {
            let _serialized = gate.lock().await;
            reporter.submit_attachment_event(&change).await;
        });
        Ok(())
    }

    async fn submit_attachment_event(&self, change: &AttachmentStateChange) {
        let mut backoff = ExponentialBackoff::new(
            self.config.backoff_min(),
            self.config.backoff_max(),
            self.config.backoff_multiplier,
        );
        let attachment = &change.attachment;
        loop {
            if attachment.is_sent() {
                debug!(
                    attachment_arn = %attachment.arn(),
                    "attachment state already acknowledged, nothing to submit"
                );
                return;
            }
            if attachment.has_expired() {
                warn!(
                    attachment_arn = %attachment.arn(),
                    task_arn = %attachment.task_arn(),
                    "attachment expired before its state change could be submitted"
                );
                return;
            }

            match self
                .client
                .submit_attachment_state_change(change.as_request())
                .await
            {
                Ok(()) => {
                    attachment.mark_sent();
                    info!(
                        attachment_arn = %attachment.arn(),
                        task_arn = %attachment.task_arn(),
                        status = %attachment.status(),
                        "submitted attachment state change"
                    );
                    return;
                }
                Err(err) if err.is_invalid_parameter() => {
                    warn!(
                        attachment_arn = %attachment.arn(),
                        error = %err,
                        "control plane rejected attachment state change, dropping"
                    );
                    return;
                }
                Err(err) => {
                    warn!(
                        attachment_arn = %attachment.arn(),
                        error = %err,
                        retriable = err.is_retriable(),
                        "failed to submit attachment state change, will retry"
                    );
                    let delay = backoff.next_delay();
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }
}
