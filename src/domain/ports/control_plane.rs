//! Outbound port for the remote control plane.
//!
//! The reporting pipeline knows nothing about transport or serialization;
//! it hands fully-assembled submission envelopes to this trait and
//! classifies the returned error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::{AttachmentStatus, ContainerStatus, ManagedAgentStatus, TaskStatus};

/// Client for submitting state changes to the control plane.
///
/// Implementations must be safe for concurrent callers; the pipeline
/// bounds concurrency but issues calls from many per-task workers.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Submit a task-level state change, including any batched container
    /// and managed-agent transitions and an optional attachment record.
    async fn submit_task_state_change(
        &self,
        change: TaskStateChangeRequest,
    ) -> Result<(), SubmitError>;

    /// Submit a standalone attachment state change.
    async fn submit_attachment_state_change(
        &self,
        change: AttachmentStateChangeRequest,
    ) -> Result<(), SubmitError>;
}

/// Submission envelope for one task-level transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStateChangeRequest {
    pub task_arn: String,
    pub status: TaskStatus,
    pub containers: Vec<ContainerStateChangeRequest>,
    pub managed_agents: Vec<ManagedAgentStateChangeRequest>,
    pub attachment: Option<AttachmentStateChangeRequest>,
    pub pull_started_at: Option<DateTime<Utc>>,
    pub pull_stopped_at: Option<DateTime<Utc>>,
    pub execution_stopped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStateChangeRequest {
    pub container_name: String,
    pub status: ContainerStatus,
    pub exit_code: Option<i32>,
    pub runtime_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedAgentStateChangeRequest {
    pub container_name: String,
    pub name: String,
    pub status: ManagedAgentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentStateChangeRequest {
    pub attachment_arn: String,
    pub task_arn: String,
    pub status: AttachmentStatus,
}

/// Errors a control-plane submission can return.
///
/// The pipeline distinguishes exactly one permanent class: a rejected
/// parameter set, which drops the offending event. Every other class is
/// retried under backoff, including errors explicitly marked
/// non-retriable by the transport.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The control plane rejected the envelope as malformed. Permanent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The control plane asked the agent to slow down.
    #[error("throttled by control plane")]
    Throttled,

    /// Server-side failure.
    #[error("control plane server error ({code}): {message}")]
    Server { code: u16, message: String },

    /// The request did not complete in time.
    #[error("submission timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// An error the transport has already classified.
    #[error("{message}")]
    Marked { message: String, retriable: bool },
}

impl SubmitError {
    /// Whether the transport considers this error worth retrying.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::InvalidParameter(_) => false,
            Self::Throttled | Self::Server { .. } | Self::Timeout | Self::Network(_) => true,
            Self::Marked { retriable, .. } => *retriable,
        }
    }

    /// Whether this is the permanent validation class that drops the event.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_is_the_only_permanent_drop() {
        assert!(SubmitError::InvalidParameter("bad arn".into()).is_invalid_parameter());
        assert!(!SubmitError::InvalidParameter("bad arn".into()).is_retriable());
        assert!(!SubmitError::Timeout.is_invalid_parameter());
        assert!(SubmitError::Timeout.is_retriable());
    }

    #[test]
    fn marked_errors_keep_their_transport_classification() {
        let non_retriable = SubmitError::Marked {
            message: "sealed".into(),
            retriable: false,
        };
        assert!(!non_retriable.is_retriable());
        assert!(!non_retriable.is_invalid_parameter());
    }
}
