//! Durable write-through store for acknowledgement state.

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::{ContainerRecord, TaskRecord};

/// Write-through persistence for acknowledged statuses.
///
/// Invoked after every successful submission so a restarted agent does not
/// re-report transitions the control plane already acknowledged. Errors
/// are logged by callers and otherwise ignored.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_task(&self, task: &TaskRecord) -> Result<(), StoreError>;

    async fn save_container(
        &self,
        task_arn: &str,
        container: &ContainerRecord,
    ) -> Result<(), StoreError>;
}

/// A store that persists nothing.
///
/// Use this for configurations that do not require acknowledgement state
/// to survive restarts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStateStore;

impl NoopStateStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StateStore for NoopStateStore {
    async fn save_task(&self, _task: &TaskRecord) -> Result<(), StoreError> {
        Ok(())
    }

    async fn save_container(
        &self,
        _task_arn: &str,
        _container: &ContainerRecord,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}
