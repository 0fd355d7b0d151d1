//! Per-task ordered queue of outbound state changes.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::domain::models::TaskStateChange;

/// One task-level state change waiting for submission.
///
/// The `sent` flag is read and written under the owning queue's lock.
#[derive(Debug)]
pub(crate) struct OutboundEvent {
    change: TaskStateChange,
    sent: bool,
}

impl OutboundEvent {
    pub(crate) fn new(change: TaskStateChange) -> Self {
        Self {
            change,
            sent: false,
        }
    }

    pub(crate) fn change(&self) -> &TaskStateChange {
        &self.change
    }

    pub(crate) fn is_sent(&self) -> bool {
        self.sent
    }

    pub(crate) fn mark_sent(&mut self) {
        self.sent = true;
    }
}

/// Ordered submission queue for one task ARN.
///
/// Events leave in insertion order, one at a time: only the head is ever
/// examined, and at most one submission worker runs per queue (the
/// `sending` flag, guarded by the queue's mutex, enforces this).
#[derive(Debug)]
pub(crate) struct TaskReportQueue {
    pub(crate) task_arn: String,
    pub(crate) events: VecDeque<OutboundEvent>,
    pub(crate) sending: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl TaskReportQueue {
    pub(crate) fn new(task_arn: impl Into<String>) -> Self {
        Self {
            task_arn: task_arn.into(),
            events: VecDeque::new(),
            sending: false,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}
