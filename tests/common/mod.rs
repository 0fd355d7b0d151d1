//! Shared fixtures for reporter integration tests: a recording control
//! plane double with scriptable responses and an optional latch, plus
//! event builders.

// Each integration test binary compiles this module separately and uses
// a different subset of it.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use muster::adapters::memory::InMemoryTaskStateView;
use muster::domain::models::{
    ContainerRecord, ContainerStateChange, ContainerStatus, ManagedAgentStateChange,
    ManagedAgentStatus, StateChange, TaskRecord, TaskStateChange, TaskStatus,
};
use muster::domain::ports::{
    AttachmentStateChangeRequest, ControlPlaneClient, NoopStateStore, SubmitError,
    TaskStateChangeRequest, TaskStateView,
};
use muster::services::{ReporterConfig, TaskStateReporter};

/// Control-plane double that records every submission.
///
/// Responses are scripted per call and default to success. When a latch
/// is installed, every task submission blocks after being recorded until
/// the test releases a permit, which lets tests observe in-flight
/// concurrency.
pub struct MockControlPlane {
    task_requests: Mutex<Vec<TaskStateChangeRequest>>,
    attachment_requests: Mutex<Vec<AttachmentStateChangeRequest>>,
    task_responses: Mutex<VecDeque<Result<(), SubmitError>>>,
    attachment_responses: Mutex<VecDeque<Result<(), SubmitError>>>,
    started: AtomicUsize,
    latch: Option<Arc<Semaphore>>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self {
            task_requests: Mutex::new(Vec::new()),
            attachment_requests: Mutex::new(Vec::new()),
            task_responses: Mutex::new(VecDeque::new()),
            attachment_responses: Mutex::new(VecDeque::new()),
            started: AtomicUsize::new(0),
            latch: None,
        }
    }

    /// Build a double whose task submissions block until
    /// [`release`](Self::release) is called.
    pub fn latched() -> Self {
        Self {
            latch: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn respond_with(&self, response: Result<(), SubmitError>) {
        self.task_responses.lock().unwrap().push_back(response);
    }

    pub fn respond_to_attachment_with(&self, response: Result<(), SubmitError>) {
        self.attachment_responses
            .lock()
            .unwrap()
            .push_back(response);
    }

    pub fn task_requests(&self) -> Vec<TaskStateChangeRequest> {
        self.task_requests.lock().unwrap().clone()
    }

    pub fn attachment_requests(&self) -> Vec<AttachmentStateChangeRequest> {
        self.attachment_requests.lock().unwrap().clone()
    }

    /// Number of task submissions that have entered the client so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Let `n` latched submissions complete.
    pub fn release(&self, n: usize) {
        if let Some(latch) = &self.latch {
            latch.add_permits(n);
        }
    }
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlaneClient for MockControlPlane {
    async fn submit_task_state_change(
        &self,
        change: TaskStateChangeRequest,
    ) -> Result<(), SubmitError> {
        self.task_requests.lock().unwrap().push(change);
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(latch) = &self.latch {
            let permit = latch.acquire().await.expect("latch closed");
            permit.forget();
        }
        self.task_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn submit_attachment_state_change(
        &self,
        change: AttachmentStateChangeRequest,
    ) -> Result<(), SubmitError> {
        self.attachment_requests.lock().unwrap().push(change);
        self.attachment_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

pub struct TestHarness {
    pub reporter: Arc<TaskStateReporter>,
    pub client: Arc<MockControlPlane>,
    pub view: Arc<InMemoryTaskStateView>,
    pub cancel: CancellationToken,
}

pub fn harness(client: MockControlPlane) -> TestHarness {
    harness_with_config(client, fast_config())
}

pub fn harness_with_config(client: MockControlPlane, config: ReporterConfig) -> TestHarness {
    let client = Arc::new(client);
    let view = Arc::new(InMemoryTaskStateView::new());
    let cancel = CancellationToken::new();
    let reporter = TaskStateReporter::new(
        config,
        Arc::clone(&view) as Arc<dyn TaskStateView>,
        Arc::new(NoopStateStore),
        Arc::clone(&client) as Arc<dyn ControlPlaneClient>,
        cancel.clone(),
    )
    .expect("test reporter config is valid");
    TestHarness {
        reporter,
        client,
        view,
        cancel,
    }
}

/// Production defaults, with backoff shrunk so retry tests finish fast
/// and the drain ticker pushed out of the way.
pub fn fast_config() -> ReporterConfig {
    ReporterConfig {
        backoff_min_ms: 5,
        backoff_max_ms: 20,
        drain_interval_ms: 3_600_000,
        ..ReporterConfig::default()
    }
}

/// Register a running task in the state view and hand back its record.
pub fn register_task(view: &InMemoryTaskStateView, arn: &str) -> Arc<TaskRecord> {
    let task = Arc::new(TaskRecord::new(arn, TaskStatus::Running));
    view.add_task(Arc::clone(&task));
    task
}

pub fn task_event(task: &Arc<TaskRecord>) -> StateChange {
    StateChange::Task(TaskStateChange::new(Arc::clone(task), TaskStatus::Running))
}

pub fn task_event_stopped(task: &Arc<TaskRecord>) -> StateChange {
    StateChange::Task(TaskStateChange::new(Arc::clone(task), TaskStatus::Stopped))
}

pub fn container_event(arn: &str) -> StateChange {
    StateChange::Container(ContainerStateChange::new(
        arn,
        Arc::new(ContainerRecord::new("container-name")),
        ContainerStatus::Running,
    ))
}

pub fn container_event_stopped(arn: &str) -> StateChange {
    StateChange::Container(ContainerStateChange::new(
        arn,
        Arc::new(ContainerRecord::new("container-name")),
        ContainerStatus::Stopped,
    ))
}

pub fn managed_agent_event(arn: &str) -> StateChange {
    StateChange::ManagedAgent(ManagedAgentStateChange::new(
        arn,
        Arc::new(ContainerRecord::new("container-name")),
        "exec-agent",
        ManagedAgentStatus::Running,
    ))
}

/// Poll until `condition` holds, panicking after two seconds.
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Poll until the client has recorded `n` task submissions.
pub async fn wait_for_task_submissions(client: &MockControlPlane, n: usize) {
    wait_until("task submissions", || client.task_requests().len() >= n).await;
}
