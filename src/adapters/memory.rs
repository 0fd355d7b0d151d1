//! In-memory task state view.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::models::TaskRecord;
use crate::domain::ports::TaskStateView;

/// Authoritative task state held in memory.
///
/// The task engine registers records as tasks start and removes them once
/// they are cleaned up; the reporting pipeline reads through the
/// [`TaskStateView`] port.
#[derive(Debug, Default)]
pub struct InMemoryTaskStateView {
    tasks: RwLock<HashMap<String, Arc<TaskRecord>>>,
}

impl InMemoryTaskStateView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: Arc<TaskRecord>) {
        self.tasks
            .write()
            .expect("task state lock poisoned")
            .insert(task.arn().to_string(), task);
    }

    pub fn remove_task(&self, arn: &str) {
        self.tasks
            .write()
            .expect("task state lock poisoned")
            .remove(arn);
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().expect("task state lock poisoned").len()
    }
}

impl TaskStateView for InMemoryTaskStateView {
    fn task_by_arn(&self, arn: &str) -> Option<Arc<TaskRecord>> {
        self.tasks
            .read()
            .expect("task state lock poisoned")
            .get(arn)
            .cloned()
    }
}
