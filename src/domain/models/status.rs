//! Lifecycle statuses for the subjects a state change can describe.
//!
//! Status ordering matters: the control plane acknowledges transitions
//! monotonically, so a change whose target status is at or below the
//! subject's sent status carries no new information.

use serde::{Deserialize, Serialize};

/// Status of a task as reported to the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No status has been asserted yet.
    None,
    /// Task resources are created but nothing is running.
    Created,
    /// All essential containers are running.
    Running,
    /// Task has stopped. Terminal.
    Stopped,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::None
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a container within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    None,
    /// Image has been pulled.
    Pulled,
    /// Container is created in the runtime.
    Created,
    /// Container process is running.
    Running,
    /// Container has exited. Terminal.
    Stopped,
}

impl Default for ContainerStatus {
    fn default() -> Self {
        Self::None
    }
}

impl ContainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pulled => "pulled",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "pulled" => Some(Self::Pulled),
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of an auxiliary agent process running inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedAgentStatus {
    None,
    Created,
    Running,
    Stopped,
}

impl Default for ManagedAgentStatus {
    fn default() -> Self {
        Self::None
    }
}

impl ManagedAgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl std::fmt::Display for ManagedAgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a network attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStatus {
    Attaching,
    Attached,
    Detached,
}

impl AttachmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attaching => "attaching",
            Self::Attached => "attached",
            Self::Detached => "detached",
        }
    }
}

impl std::fmt::Display for AttachmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_ordering_follows_lifecycle() {
        assert!(TaskStatus::None < TaskStatus::Created);
        assert!(TaskStatus::Created < TaskStatus::Running);
        assert!(TaskStatus::Running < TaskStatus::Stopped);
    }

    #[test]
    fn only_stopped_is_terminal() {
        assert!(TaskStatus::Stopped.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(ContainerStatus::Stopped.is_terminal());
        assert!(!ContainerStatus::Pulled.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            TaskStatus::None,
            TaskStatus::Created,
            TaskStatus::Running,
            TaskStatus::Stopped,
        ] {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::from_str("paused"), None);
    }
}
