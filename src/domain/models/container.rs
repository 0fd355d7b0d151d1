//! Container record shared between the state engine and the reporting pipeline.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::status::{ContainerStatus, ManagedAgentStatus};

/// A container belonging to a tracked task.
///
/// Carries the acknowledgement state for the container itself and for each
/// managed agent running inside it, keyed by agent name.
#[derive(Debug)]
pub struct ContainerRecord {
    name: String,
    runtime_id: Option<String>,
    sent_status: RwLock<ContainerStatus>,
    agent_sent_statuses: RwLock<HashMap<String, ManagedAgentStatus>>,
}

impl ContainerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runtime_id: None,
            sent_status: RwLock::new(ContainerStatus::None),
            agent_sent_statuses: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_runtime_id(mut self, runtime_id: impl Into<String>) -> Self {
        self.runtime_id = Some(runtime_id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime_id(&self) -> Option<&str> {
        self.runtime_id.as_deref()
    }

    pub async fn sent_status(&self) -> ContainerStatus {
        *self.sent_status.read().await
    }

    pub async fn set_sent_status(&self, status: ContainerStatus) {
        *self.sent_status.write().await = status;
    }

    /// Advance the sent status, keeping it monotonically non-decreasing.
    pub async fn advance_sent_status(&self, status: ContainerStatus) {
        let mut sent = self.sent_status.write().await;
        if status > *sent {
            *sent = status;
        }
    }

    /// Acknowledged status for a managed agent, `None` status if the agent
    /// has never been reported.
    pub async fn managed_agent_sent_status(&self, agent_name: &str) -> ManagedAgentStatus {
        self.agent_sent_statuses
            .read()
            .await
            .get(agent_name)
            .copied()
            .unwrap_or_default()
    }

    pub async fn set_managed_agent_sent_status(&self, agent_name: &str, status: ManagedAgentStatus) {
        self.agent_sent_statuses
            .write()
            .await
            .insert(agent_name.to_string(), status);
    }

    /// Advance a managed agent's sent status, monotonically.
    pub async fn advance_managed_agent_sent_status(
        &self,
        agent_name: &str,
        status: ManagedAgentStatus,
    ) {
        let mut agents = self.agent_sent_statuses.write().await;
        let sent = agents.entry(agent_name.to_string()).or_default();
        if status > *sent {
            *sent = status;
        }
    }
}
