//! Task record shared between the state engine and the reporting pipeline.

use tokio::sync::RwLock;

use super::status::TaskStatus;

/// A tracked task, identified by its ARN.
///
/// The record is shared (`Arc`) between the authoritative state view and
/// the reporting pipeline. `known_status` is what the agent believes the
/// task is doing; `sent_status` is the highest status the control plane
/// has acknowledged. `sent_status` never moves backwards.
#[derive(Debug)]
pub struct TaskRecord {
    arn: String,
    known_status: RwLock<TaskStatus>,
    sent_status: RwLock<TaskStatus>,
}

impl TaskRecord {
    pub fn new(arn: impl Into<String>, known_status: TaskStatus) -> Self {
        Self {
            arn: arn.into(),
            known_status: RwLock::new(known_status),
            sent_status: RwLock::new(TaskStatus::None),
        }
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    pub async fn known_status(&self) -> TaskStatus {
        *self.known_status.read().await
    }

    pub async fn set_known_status(&self, status: TaskStatus) {
        *self.known_status.write().await = status;
    }

    pub async fn sent_status(&self) -> TaskStatus {
        *self.sent_status.read().await
    }

    /// Set the sent status unconditionally. Callers that advance after an
    /// acknowledgement should use [`advance_sent_status`](Self::advance_sent_status).
    pub async fn set_sent_status(&self, status: TaskStatus) {
        *self.sent_status.write().await = status;
    }

    /// Advance the sent status, keeping it monotonically non-decreasing.
    pub async fn advance_sent_status(&self, status: TaskStatus) {
        let mut sent = self.sent_status.write().await;
        if status > *sent {
            *sent = status;
        }
    }
}
