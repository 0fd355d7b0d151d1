//! Read-only view of the authoritative task state.

use std::sync::Arc;

use crate::domain::models::TaskRecord;

/// Lookup into the task engine's authoritative state.
///
/// Pure read; implementations must be safe for concurrent callers. The
/// pipeline consults it before every submission to discard events whose
/// task has disappeared or already stopped.
pub trait TaskStateView: Send + Sync {
    /// The tracked task for `arn`, or `None` if the engine no longer
    /// knows it.
    fn task_by_arn(&self, arn: &str) -> Option<Arc<TaskRecord>>;
}
