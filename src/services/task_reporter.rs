//! Task state-change reporting pipeline.
//!
//! Accepts state-change events from the task engine, batches container and
//! managed-agent transitions per task, and submits task-level transitions
//! to the control plane in strict per-task order. Submissions across tasks
//! run concurrently up to a global ceiling; transient failures retry under
//! exponential backoff; acknowledged transitions are deduplicated and
//! written through to the durable store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::ReporterError;
use crate::domain::models::{
    ContainerStateChange, ManagedAgentStateChange, StateChange, TaskStateChange,
};
use crate::domain::ports::{ControlPlaneClient, StateStore, TaskStateView};

use super::backoff::{Backoff, ExponentialBackoff};
use super::config::{ConfigError, ReporterConfig};
use super::task_events::{OutboundEvent, TaskReportQueue};

/// Progress of one submission cycle against a queue head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitProgress {
    /// The queue is empty; the worker can exit.
    Drained,
    /// The head was consumed and more events wait.
    MoreEvents,
    /// The head stays queued; sleep the backoff delay and try again.
    RetryAfterBackoff,
}

/// Maps owned by the reporter, guarded together by one read-write lock.
///
/// Lock order is always reporter lock then queue lock, never the reverse.
struct ReporterMaps {
    /// Active submission queues by task ARN.
    queues: HashMap<String, Arc<Mutex<TaskReportQueue>>>,
    /// Container changes awaiting the next task-level change per ARN.
    batched_containers: HashMap<String, Vec<ContainerStateChange>>,
    /// Managed-agent changes awaiting the next task-level change per ARN.
    batched_managed_agents: HashMap<String, Vec<ManagedAgentStateChange>>,
}

/// Façade of the reporting pipeline.
///
/// Constructed once per agent with its collaborators and an ambient
/// cancellation token. Producers feed it through
/// [`add_state_change_event`](Self::add_state_change_event); submission is
/// fire-and-forget from their perspective.
pub struct TaskStateReporter {
    config: ReporterConfig,
    state_view: Arc<dyn TaskStateView>,
    store: Arc<dyn StateStore>,
    client: Arc<dyn ControlPlaneClient>,
    /// Bounds concurrent in-flight submissions across all tasks.
    submit_semaphore: Arc<Semaphore>,
    maps: RwLock<ReporterMaps>,
    cancel: CancellationToken,
    handle: Weak<TaskStateReporter>,
}

impl TaskStateReporter {
    /// Create the reporter and start its background drain ticker. Must be
    /// called from within a tokio runtime. Rejects out-of-range
    /// configuration (a zero concurrency ceiling or inverted backoff
    /// bounds) before anything is spawned.
    pub fn new(
        config: ReporterConfig,
        state_view: Arc<dyn TaskStateView>,
        store: Arc<dyn StateStore>,
        client: Arc<dyn ControlPlaneClient>,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let submit_semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        let reporter = Arc::new_cyclic(|handle| Self {
            config,
            state_view,
            store,
            client,
            submit_semaphore,
            maps: RwLock::new(ReporterMaps {
                queues: HashMap::new(),
                batched_containers: HashMap::new(),
                batched_managed_agents: HashMap::new(),
            }),
            cancel,
            handle: handle.clone(),
        });
        reporter.spawn_drain_ticker();
        Ok(reporter)
    }

    /// Accept one state-change event.
    ///
    /// Container and managed-agent changes are batched until the next
    /// task-level change for their ARN and never trigger a submission by
    /// themselves. Task-level changes drain the matching batches, are
    /// dedupe-filtered, and start the per-task submission worker if one is
    /// not already running. Standalone attachment changes belong to the
    /// attachment pipeline and are rejected here.
    pub async fn add_state_change_event(&self, change: StateChange) -> Result<(), ReporterError> {
        if self.cancel.is_cancelled() {
            return Err(ReporterError::Cancelled);
        }
        if change.task_arn().is_empty() {
            return Err(ReporterError::InvalidEvent(format!(
                "{} state change without a task ARN",
                change.kind()
            )));
        }

        match change {
            StateChange::Container(change) => {
                let mut maps = self.maps.write().await;
                maps.batched_containers
                    .entry(change.task_arn.clone())
                    .or_default()
                    .push(change);
                Ok(())
            }
            StateChange::ManagedAgent(change) => {
                let mut maps = self.maps.write().await;
                maps.batched_managed_agents
                    .entry(change.task_arn.clone())
                    .or_default()
                    .push(change);
                Ok(())
            }
            StateChange::Task(change) => self.enqueue_task_change(change).await,
            StateChange::Attachment(_) => Err(ReporterError::InvalidEvent(
                "standalone attachment changes are reported through the attachment pipeline".into(),
            )),
        }
    }

    /// Number of task ARNs with an active submission queue.
    pub async fn active_queue_count(&self) -> usize {
        self.maps.read().await.queues.len()
    }

    /// Number of task ARNs with container or managed-agent changes still
    /// waiting for a task-level carrier.
    pub async fn pending_batch_count(&self) -> usize {
        let maps = self.maps.read().await;
        maps.batched_containers
            .keys()
            .chain(maps.batched_managed_agents.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    async fn enqueue_task_change(&self, mut change: TaskStateChange) -> Result<(), ReporterError> {
        let mut maps = self.maps.write().await;

        // Fold in the children batched since the previous task-level
        // change for this ARN. Insertion order is preserved.
        if let Some(batched) = maps.batched_containers.remove(&change.task_arn) {
            change.containers.extend(batched);
        }
        if let Some(batched) = maps.batched_managed_agents.remove(&change.task_arn) {
            change.managed_agents.extend(batched);
        }

        // Dedup decides whether the whole event is worth queueing: a task
        // transition already acknowledged, carrying no unsent attachment
        // and no unsent child, is dropped here and never transmitted.
        if !change.should_be_sent().await && !change.attachment_should_be_sent() {
            debug!(
                task_arn = %change.task_arn,
                status = %change.status,
                "task transition already acknowledged, dropping event"
            );
            return Ok(());
        }

        let task_arn = change.task_arn.clone();
        let queue = Arc::clone(
            maps.queues
                .entry(task_arn.clone())
                .or_insert_with(|| Arc::new(Mutex::new(TaskReportQueue::new(task_arn.clone())))),
        );

        let mut guard = queue.lock().await;
        guard.events.push_back(OutboundEvent::new(change));
        debug!(task_arn = %guard.task_arn, queued = guard.len(), "queued task state change");
        if !guard.sending {
            guard.sending = true;
            drop(guard);
            self.spawn_submission_worker(task_arn, queue);
        }
        Ok(())
    }

    /// One submission worker runs per task ARN while its queue is
    /// non-empty. It exits once the queue drains or the pipeline is
    /// cancelled.
    fn spawn_submission_worker(&self, task_arn: String, queue: Arc<Mutex<TaskReportQueue>>) {
        let Some(reporter) = self.handle.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let mut backoff = ExponentialBackoff::new(
                reporter.config.backoff_min(),
                reporter.config.backoff_max(),
                reporter.config.backoff_multiplier,
            );
            loop {
                if reporter.cancel.is_cancelled() {
                    queue.lock().await.sending = false;
                    return;
                }
                match reporter.submit_first_event(&queue, &mut backoff).await {
                    SubmitProgress::Drained => break,
                    SubmitProgress::MoreEvents => {}
                    SubmitProgress::RetryAfterBackoff => {
                        let delay = backoff.next_delay();
                        tokio::select! {
                            _ = reporter.cancel.cancelled() => {
                                queue.lock().await.sending = false;
                                return;
                            }
                            _ = sleep(delay) => {}
                        }
                    }
                }
            }
            reporter.remove_drained_queue(&task_arn).await;
        });
    }

    /// Examine the queue head and submit it if it still carries
    /// unacknowledged information.
    ///
    /// The semaphore permit is acquired with no lock held; the queue lock
    /// is then held across the submission so the sent flags and
    /// acknowledged statuses advance atomically with the pop.
    pub(crate) async fn submit_first_event(
        &self,
        queue: &Mutex<TaskReportQueue>,
        backoff: &mut dyn Backoff,
    ) -> SubmitProgress {
        let _permit = match self.submit_semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return SubmitProgress::Drained,
        };

        let mut queue = queue.lock().await;
        let change = match queue.events.front() {
            Some(event) => event.change().clone(),
            None => {
                queue.sending = false;
                return SubmitProgress::Drained;
            }
        };

        // Cross-check against the authoritative state: a task that is gone
        // or already stopped invalidates queued non-terminal transitions.
        match self.state_view.task_by_arn(&change.task_arn) {
            None => {
                debug!(task_arn = %change.task_arn, "task no longer tracked, discarding state change");
                queue.events.pop_front();
                return Self::after_pop(&mut queue);
            }
            Some(record) => {
                let known = record.known_status().await;
                if known.is_terminal() && !change.status.is_terminal() {
                    debug!(
                        task_arn = %change.task_arn,
                        status = %change.status,
                        "task already stopped, discarding stale transition"
                    );
                    queue.events.pop_front();
                    return Self::after_pop(&mut queue);
                }
            }
        }

        let task_sendable = change.should_be_sent().await;
        if !task_sendable && !change.attachment_should_be_sent() {
            debug!(
                task_arn = %change.task_arn,
                status = %change.status,
                "state change carries nothing unacknowledged, discarding"
            );
            queue.events.pop_front();
            return Self::after_pop(&mut queue);
        }

        let request = change.as_request();
        match self.client.submit_task_state_change(request).await {
            Ok(()) => {
                if task_sendable {
                    change.mark_sent().await;
                    self.persist_acknowledgement(&change).await;
                } else if let Some(attachment) = &change.attachment {
                    attachment.mark_sent();
                }
                if let Some(event) = queue.events.front_mut() {
                    event.mark_sent();
                }
                backoff.reset();
                info!(
                    task_arn = %change.task_arn,
                    status = %change.status,
                    "submitted task state change"
                );
                queue.events.pop_front();
                Self::after_pop(&mut queue)
            }
            Err(err) if err.is_invalid_parameter() => {
                warn!(
                    task_arn = %change.task_arn,
                    error = %err,
                    "control plane rejected state change, dropping event"
                );
                backoff.reset();
                queue.events.pop_front();
                Self::after_pop(&mut queue)
            }
            Err(err) => {
                warn!(
                    task_arn = %change.task_arn,
                    error = %err,
                    retriable = err.is_retriable(),
                    "failed to submit task state change, will retry"
                );
                SubmitProgress::RetryAfterBackoff
            }
        }
    }

    fn after_pop(queue: &mut TaskReportQueue) -> SubmitProgress {
        if queue.events.is_empty() {
            queue.sending = false;
            SubmitProgress::Drained
        } else {
            SubmitProgress::MoreEvents
        }
    }

    /// Write the advanced acknowledgement state through to the durable
    /// store. Failures are logged and ignored; the submission already
    /// succeeded.
    async fn persist_acknowledgement(&self, change: &TaskStateChange) {
        if let Err(err) = self.store.save_task(&change.task).await {
            warn!(
                task_arn = %change.task_arn,
                error = %err,
                "failed to persist task acknowledgement"
            );
        }
        for container in &change.containers {
            if let Err(err) = self
                .store
                .save_container(&change.task_arn, &container.container)
                .await
            {
                warn!(
                    task_arn = %change.task_arn,
                    container = %container.container_name,
                    error = %err,
                    "failed to persist container acknowledgement"
                );
            }
        }
    }

    /// Drop the ARN-to-queue binding once a queue is empty and idle.
    async fn remove_drained_queue(&self, task_arn: &str) {
        let mut maps = self.maps.write().await;
        if let Some(queue) = maps.queues.get(task_arn) {
            let guard = queue.lock().await;
            if guard.is_empty() && !guard.sending {
                let age_ms = (chrono::Utc::now() - guard.created_at).num_milliseconds();
                drop(guard);
                maps.queues.remove(task_arn);
                debug!(task_arn, age_ms, "removed drained submission queue");
            }
        }
    }

    /// Synthesize task-level changes for ARNs whose batched container or
    /// managed-agent transitions never got a task-level carrier.
    ///
    /// Batches for stopped tasks are cleared; batches for tasks the state
    /// view does not know yet are left for a later pass.
    pub(crate) async fn task_state_changes_to_send(&self) -> Vec<TaskStateChange> {
        let mut maps = self.maps.write().await;
        let arns: BTreeSet<String> = maps
            .batched_containers
            .keys()
            .chain(maps.batched_managed_agents.keys())
            .cloned()
            .collect();

        let mut changes = Vec::new();
        for arn in arns {
            match self.state_view.task_by_arn(&arn) {
                None => continue,
                Some(record) => {
                    let known = record.known_status().await;
                    if known.is_terminal() {
                        debug!(task_arn = %arn, "task stopped, clearing batched child transitions");
                        maps.batched_containers.remove(&arn);
                        maps.batched_managed_agents.remove(&arn);
                        continue;
                    }
                    changes.push(TaskStateChange::new(record, known));
                }
            }
        }
        changes
    }

    /// Periodically flush orphaned batches through the normal intake path.
    fn spawn_drain_ticker(&self) {
        let handle = self.handle.clone();
        let cancel = self.cancel.clone();
        let period = self.config.drain_interval();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval fires immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                let Some(reporter) = handle.upgrade() else {
                    return;
                };
                for change in reporter.task_state_changes_to_send().await {
                    let task_arn = change.task_arn.clone();
                    if let Err(err) = reporter
                        .add_state_change_event(StateChange::Task(change))
                        .await
                    {
                        warn!(
                            task_arn = %task_arn,
                            error = %err,
                            "failed to flush batched state changes"
                        );
                    }
                }
            }
        });
    }
}
