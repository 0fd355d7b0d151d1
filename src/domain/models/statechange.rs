//! State-change events flowing from the task engine to the reporting pipeline.
//!
//! Exactly four kinds exist. Container and managed-agent changes are
//! batched per task until a task-level change carries them out; attachment
//! changes are reported through their own pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::ports::control_plane::{
    AttachmentStateChangeRequest, ContainerStateChangeRequest, ManagedAgentStateChangeRequest,
    TaskStateChangeRequest,
};

use super::attachment::Attachment;
use super::container::ContainerRecord;
use super::status::{ContainerStatus, ManagedAgentStatus, TaskStatus};
use super::task::TaskRecord;

/// An asynchronous state-change event accepted by the reporting pipeline.
#[derive(Debug, Clone)]
pub enum StateChange {
    Task(TaskStateChange),
    Container(ContainerStateChange),
    ManagedAgent(ManagedAgentStateChange),
    Attachment(AttachmentStateChange),
}

impl StateChange {
    /// ARN of the task this change belongs to.
    pub fn task_arn(&self) -> &str {
        match self {
            Self::Task(change) => &change.task_arn,
            Self::Container(change) => &change.task_arn,
            Self::ManagedAgent(change) => &change.task_arn,
            Self::Attachment(change) => change.attachment.task_arn(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Container(_) => "container",
            Self::ManagedAgent(_) => "managed_agent",
            Self::Attachment(_) => "attachment",
        }
    }
}

/// A task-level transition, carrying the container and managed-agent
/// changes accumulated since the previous task-level transition.
#[derive(Debug, Clone)]
pub struct TaskStateChange {
    pub task_arn: String,
    pub status: TaskStatus,
    /// Handle to the shared task record, used to read and advance the
    /// acknowledged status.
    pub task: Arc<TaskRecord>,
    pub attachment: Option<Arc<Attachment>>,
    pub containers: Vec<ContainerStateChange>,
    pub managed_agents: Vec<ManagedAgentStateChange>,
    pub pull_started_at: Option<DateTime<Utc>>,
    pub pull_stopped_at: Option<DateTime<Utc>>,
    pub execution_stopped_at: Option<DateTime<Utc>>,
}

impl TaskStateChange {
    pub fn new(task: Arc<TaskRecord>, status: TaskStatus) -> Self {
        Self {
            task_arn: task.arn().to_string(),
            status,
            task,
            attachment: None,
            containers: Vec::new(),
            managed_agents: Vec::new(),
            pull_started_at: None,
            pull_stopped_at: None,
            execution_stopped_at: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Arc<Attachment>) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Whether this change still carries information the control plane has
    /// not acknowledged: a task status advance, or at least one unsent
    /// container or managed-agent child. A `None` target never advances
    /// the task (it is the minimum status), but batched children can still
    /// make the event worth transmitting.
    pub async fn should_be_sent(&self) -> bool {
        if self.task.sent_status().await < self.status {
            return true;
        }
        for container in &self.containers {
            if container.should_be_sent().await {
                return true;
            }
        }
        for agent in &self.managed_agents {
            if agent.should_be_sent().await {
                return true;
            }
        }
        false
    }

    /// Whether the carried attachment still needs to reach the control
    /// plane. Expired attachments are abandoned; their timer has marked
    /// them sent or will shortly.
    pub fn attachment_should_be_sent(&self) -> bool {
        matches!(&self.attachment, Some(a) if !a.is_sent() && !a.has_expired())
    }

    /// Build the submission envelope. Children ride along in insertion
    /// order; dedup decides whether the whole event is transmitted, not
    /// which children it carries.
    pub fn as_request(&self) -> TaskStateChangeRequest {
        let containers = self.containers.iter().map(ContainerStateChange::as_request).collect();
        let managed_agents = self
            .managed_agents
            .iter()
            .map(ManagedAgentStateChange::as_request)
            .collect();
        TaskStateChangeRequest {
            task_arn: self.task_arn.clone(),
            status: self.status,
            containers,
            managed_agents,
            attachment: self.attachment.as_deref().map(attachment_request),
            pull_started_at: self.pull_started_at,
            pull_stopped_at: self.pull_stopped_at,
            execution_stopped_at: self.execution_stopped_at,
        }
    }

    /// Record the acknowledgement: advance the sent status of the task,
    /// every carried child, and the attachment.
    pub async fn mark_sent(&self) {
        self.task.advance_sent_status(self.status).await;
        for container in &self.containers {
            container
                .container
                .advance_sent_status(container.status)
                .await;
        }
        for agent in &self.managed_agents {
            agent
                .container
                .advance_managed_agent_sent_status(&agent.name, agent.status)
                .await;
        }
        if let Some(attachment) = &self.attachment {
            attachment.mark_sent();
        }
    }
}

/// A container-level transition awaiting a task-level carrier.
#[derive(Debug, Clone)]
pub struct ContainerStateChange {
    pub task_arn: String,
    pub container_name: String,
    pub status: ContainerStatus,
    /// Handle to the shared container record.
    pub container: Arc<ContainerRecord>,
    pub exit_code: Option<i32>,
    pub runtime_id: Option<String>,
    pub reason: Option<String>,
}

impl ContainerStateChange {
    pub fn new(
        task_arn: impl Into<String>,
        container: Arc<ContainerRecord>,
        status: ContainerStatus,
    ) -> Self {
        Self {
            task_arn: task_arn.into(),
            container_name: container.name().to_string(),
            status,
            runtime_id: container.runtime_id().map(str::to_string),
            container,
            exit_code: None,
            reason: None,
        }
    }

    pub async fn should_be_sent(&self) -> bool {
        self.status > self.container.sent_status().await
    }

    pub fn as_request(&self) -> ContainerStateChangeRequest {
        ContainerStateChangeRequest {
            container_name: self.container_name.clone(),
            status: self.status,
            exit_code: self.exit_code,
            runtime_id: self.runtime_id.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// A managed-agent transition awaiting a task-level carrier.
#[derive(Debug, Clone)]
pub struct ManagedAgentStateChange {
    pub task_arn: String,
    /// Container the agent runs in; holds the per-agent sent statuses.
    pub container: Arc<ContainerRecord>,
    pub name: String,
    pub status: ManagedAgentStatus,
    pub reason: Option<String>,
}

impl ManagedAgentStateChange {
    pub fn new(
        task_arn: impl Into<String>,
        container: Arc<ContainerRecord>,
        name: impl Into<String>,
        status: ManagedAgentStatus,
    ) -> Self {
        Self {
            task_arn: task_arn.into(),
            container,
            name: name.into(),
            status,
            reason: None,
        }
    }

    pub async fn should_be_sent(&self) -> bool {
        self.status > self.container.managed_agent_sent_status(&self.name).await
    }

    pub fn as_request(&self) -> ManagedAgentStateChangeRequest {
        ManagedAgentStateChangeRequest {
            container_name: self.container.name().to_string(),
            name: self.name.clone(),
            status: self.status,
            reason: self.reason.clone(),
        }
    }
}

/// A standalone attachment transition.
#[derive(Debug, Clone)]
pub struct AttachmentStateChange {
    pub attachment: Arc<Attachment>,
}

impl AttachmentStateChange {
    pub fn new(attachment: Arc<Attachment>) -> Self {
        Self { attachment }
    }

    pub fn as_request(&self) -> AttachmentStateChangeRequest {
        attachment_request(&self.attachment)
    }
}

fn attachment_request(attachment: &Attachment) -> AttachmentStateChangeRequest {
    AttachmentStateChangeRequest {
        attachment_arn: attachment.arn().to_string(),
        task_arn: attachment.task_arn().to_string(),
        status: attachment.status(),
    }
}
