//! Queue consumer.
//!
//! The queue transport is external. [`TaskQueue`] is the at-least-once
//! contract the worker needs from it; [`MemoryTaskQueue`] implements it in
//! process with bounded attempts and exponential backoff.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::{PlacementTask, TaskIntake, TaskOutcome};
use crate::context::RunContext;

/// Identifies one delivery of a task.
pub type DeliveryId = u64;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("unknown delivery: {0}")]
    UnknownDelivery(DeliveryId),

    #[error("queue backend error: {0}")]
    Backend(String),
}

/// A claimed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub delivery_id: DeliveryId,
    /// 1 on first delivery.
    pub attempt: u32,
    pub task: PlacementTask,
}

/// At-least-once task delivery.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Takes the next ready task, if any.
    async fn claim(&self) -> Result<Option<QueuedTask>, QueueError>;

    /// Marks a delivery done.
    async fn ack(&self, delivery_id: DeliveryId) -> Result<(), QueueError>;

    /// Schedules redelivery. The queue may dead-letter instead once its
    /// attempt budget is spent.
    async fn retry(&self, delivery_id: DeliveryId, error_kind: &str) -> Result<(), QueueError>;

    /// Parks a delivery that must not be retried.
    async fn dead_letter(&self, delivery_id: DeliveryId, error_kind: &str)
        -> Result<(), QueueError>;

    /// Hands an unsettled delivery back for immediate redelivery.
    async fn release(&self, delivery_id: DeliveryId) -> Result<(), QueueError>;
}

/// Configuration for the intake worker.
#[derive(Debug, Clone)]
pub struct IntakeWorkerConfig {
    /// How long to sleep when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for IntakeWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Drains a [`TaskQueue`] through [`TaskIntake`].
pub struct IntakeWorker {
    intake: TaskIntake,
    queue: Arc<dyn TaskQueue>,
    config: IntakeWorkerConfig,
}

impl IntakeWorker {
    pub fn new(intake: TaskIntake, queue: Arc<dyn TaskQueue>, config: IntakeWorkerConfig) -> Self {
        Self {
            intake,
            queue,
            config,
        }
    }

    /// Run the worker until the shutdown signal is received.
    #[instrument(skip(self, shutdown), name = "intake_worker")]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Starting intake worker"
        );

        let mut tasks_processed: u64 = 0;

        loop {
            if *shutdown.borrow() {
                info!(tasks_processed, "Shutdown signal received, stopping intake worker");
                break;
            }

            match self.run_once().await {
                Ok(Some(_)) => {
                    tasks_processed += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "Intake worker queue error"),
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(tasks_processed, "Shutdown signal received during poll wait");
                        break;
                    }
                }
                _ = sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Claims and settles at most one task. Returns its outcome, or `None`
    /// when nothing was ready.
    pub async fn run_once(&self) -> Result<Option<TaskOutcome>, QueueError> {
        let Some(queued) = self.queue.claim().await? else {
            return Ok(None);
        };

        let ctx = RunContext::new();
        debug!(
            request_id = %ctx.request_id,
            delivery_id = queued.delivery_id,
            attempt = queued.attempt,
            "Claimed placement task"
        );

        let outcome = self.intake.handle(&ctx, &queued.task).await;
        if let Err(e) = self.settle(queued.delivery_id, &outcome).await {
            // A redelivered placement comes back as ALREADY_ASSIGNED.
            warn!(
                delivery_id = queued.delivery_id,
                error = %e,
                "Failed to settle delivery, releasing it"
            );
            if let Err(release_err) = self.queue.release(queued.delivery_id).await {
                error!(
                    delivery_id = queued.delivery_id,
                    error = %release_err,
                    "Failed to release delivery"
                );
            }
            return Err(e);
        }
        Ok(Some(outcome))
    }

    async fn settle(&self, delivery_id: DeliveryId, outcome: &TaskOutcome) -> Result<(), QueueError> {
        match outcome {
            TaskOutcome::Completed(_) | TaskOutcome::Paused | TaskOutcome::Skipped { .. } => {
                self.queue.ack(delivery_id).await
            }
            TaskOutcome::Failed { report, retryable } => {
                let kind = report.error_kind.as_deref().unwrap_or("UNKNOWN");
                if *retryable {
                    self.queue.retry(delivery_id, kind).await
                } else {
                    self.queue.dead_letter(delivery_id, kind).await
                }
            }
        }
    }
}

/// Redelivery policy for [`MemoryTaskQueue`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Deliveries before a retryable failure is dead-lettered.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before delivery `attempt + 1`, doubling per attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Debug)]
struct Pending {
    attempt: u32,
    task: PlacementTask,
    not_before: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    next_delivery: DeliveryId,
    ready: VecDeque<Pending>,
    in_flight: HashMap<DeliveryId, Pending>,
    dead: Vec<(PlacementTask, String)>,
    acked: usize,
}

/// In-process [`TaskQueue`].
#[derive(Debug, Default)]
pub struct MemoryTaskQueue {
    policy: RetryPolicy,
    state: Mutex<QueueState>,
}

impl MemoryTaskQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub async fn enqueue(&self, task: PlacementTask) {
        self.state.lock().await.ready.push_back(Pending {
            attempt: 0,
            task,
            not_before: Instant::now(),
        });
    }

    /// Tasks waiting for delivery, including those in backoff.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn acked(&self) -> usize {
        self.state.lock().await.acked
    }

    /// Claimed deliveries not yet settled or released.
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Nothing pending and nothing in flight.
    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        state.ready.is_empty() && state.in_flight.is_empty()
    }

    /// Dead-lettered tasks with the error kind that parked them.
    pub async fn dead_letters(&self) -> Vec<(PlacementTask, String)> {
        self.state.lock().await.dead.clone()
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn claim(&self) -> Result<Option<QueuedTask>, QueueError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let Some(index) = state.ready.iter().position(|p| p.not_before <= now) else {
            return Ok(None);
        };
        let Some(mut pending) = state.ready.remove(index) else {
            return Ok(None);
        };

        pending.attempt += 1;
        state.next_delivery += 1;
        let delivery_id = state.next_delivery;
        let queued = QueuedTask {
            delivery_id,
            attempt: pending.attempt,
            task: pending.task.clone(),
        };
        state.in_flight.insert(delivery_id, pending);
        Ok(Some(queued))
    }

    async fn ack(&self, delivery_id: DeliveryId) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state
            .in_flight
            .remove(&delivery_id)
            .ok_or(QueueError::UnknownDelivery(delivery_id))?;
        state.acked += 1;
        Ok(())
    }

    async fn retry(&self, delivery_id: DeliveryId, error_kind: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let mut pending = state
            .in_flight
            .remove(&delivery_id)
            .ok_or(QueueError::UnknownDelivery(delivery_id))?;

        if pending.attempt >= self.policy.max_attempts {
            warn!(
                attempts = pending.attempt,
                error_kind, "Retry budget spent, dead-lettering task"
            );
            state.dead.push((pending.task, error_kind.to_string()));
            return Ok(());
        }

        let delay = self.policy.backoff(pending.attempt);
        debug!(attempt = pending.attempt, delay_ms = delay.as_millis() as u64, "Task scheduled for retry");
        pending.not_before = Instant::now() + delay;
        state.ready.push_back(pending);
        Ok(())
    }

    async fn dead_letter(
        &self,
        delivery_id: DeliveryId,
        error_kind: &str,
    ) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let pending = state
            .in_flight
            .remove(&delivery_id)
            .ok_or(QueueError::UnknownDelivery(delivery_id))?;
        state.dead.push((pending.task, error_kind.to_string()));
        Ok(())
    }

    async fn release(&self, delivery_id: DeliveryId) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let mut pending = state
            .in_flight
            .remove(&delivery_id)
            .ok_or(QueueError::UnknownDelivery(delivery_id))?;
        pending.not_before = Instant::now();
        state.ready.push_front(pending);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use squad_id::MemberId;

    use super::*;
    use crate::assign::{AssignmentOrchestrator, OrchestratorConfig};
    use crate::intake::StaticSwitch;
    use crate::store::MemoryRosterStore;

    fn task(member_id: &str, primary: &str) -> PlacementTask {
        PlacementTask {
            member_id: member_id.to_string(),
            birth_year: 2015,
            primary_position_key: primary.to_string(),
            secondary_position_key: None,
        }
    }

    fn instant_retries(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    async fn worker(queue: Arc<MemoryTaskQueue>) -> (Arc<MemoryRosterStore>, IntakeWorker) {
        let store = Arc::new(MemoryRosterStore::new());
        let orchestrator = AssignmentOrchestrator::new(store.clone(), OrchestratorConfig::default());
        let intake = TaskIntake::new(orchestrator, store.clone(), Arc::new(StaticSwitch::new(false)));
        (store, IntakeWorker::new(intake, queue, IntakeWorkerConfig::default()))
    }

    /// Memory queue whose first `ack` calls fail.
    struct FailingAcks {
        inner: MemoryTaskQueue,
        failures: AtomicU32,
    }

    #[async_trait]
    impl TaskQueue for FailingAcks {
        async fn claim(&self) -> Result<Option<QueuedTask>, QueueError> {
            self.inner.claim().await
        }

        async fn ack(&self, delivery_id: DeliveryId) -> Result<(), QueueError> {
            let failed = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(QueueError::Backend("connection reset".to_string()));
            }
            self.inner.ack(delivery_id).await
        }

        async fn retry(&self, delivery_id: DeliveryId, error_kind: &str) -> Result<(), QueueError> {
            self.inner.retry(delivery_id, error_kind).await
        }

        async fn dead_letter(
            &self,
            delivery_id: DeliveryId,
            error_kind: &str,
        ) -> Result<(), QueueError> {
            self.inner.dead_letter(delivery_id, error_kind).await
        }

        async fn release(&self, delivery_id: DeliveryId) -> Result<(), QueueError> {
            self.inner.release(delivery_id).await
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(30), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_completed_task_is_acked() {
        let queue = Arc::new(MemoryTaskQueue::new(instant_retries(3)));
        let (store, worker) = worker(queue.clone()).await;
        store.add_active_member(&MemberId::parse("m1").unwrap()).await;
        queue.enqueue(task("m1", "KALECI")).await;

        let outcome = worker.run_once().await.unwrap();

        assert!(matches!(outcome, Some(TaskOutcome::Completed(_))));
        assert_eq!(queue.acked().await, 1);
        assert_eq!(queue.pending().await, 0);
        assert!(worker.run_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_failure_is_dead_lettered() {
        let queue = Arc::new(MemoryTaskQueue::new(instant_retries(3)));
        let (store, worker) = worker(queue.clone()).await;
        store.add_active_member(&MemberId::parse("m1").unwrap()).await;
        queue.enqueue(task("m1", "quarterback")).await;

        worker.run_once().await.unwrap();

        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].1, "INVALID_POSITION");
        assert_eq!(queue.pending().await, 0);
    }

    #[tokio::test]
    async fn test_retry_budget_then_dead_letter() {
        let queue = MemoryTaskQueue::new(instant_retries(2));
        queue.enqueue(task("m1", "KALECI")).await;

        let first = queue.claim().await.unwrap().unwrap();
        assert_eq!(first.attempt, 1);
        queue.retry(first.delivery_id, "STORE").await.unwrap();
        assert_eq!(queue.pending().await, 1);

        let second = queue.claim().await.unwrap().unwrap();
        assert_eq!(second.attempt, 2);
        queue.retry(second.delivery_id, "STORE").await.unwrap();

        assert_eq!(queue.pending().await, 0);
        assert_eq!(queue.dead_letters().await.len(), 1);
    }

    #[tokio::test]
    async fn test_backoff_delays_redelivery() {
        let queue = MemoryTaskQueue::new(RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_secs(3600),
            max_backoff: Duration::from_secs(3600),
        });
        queue.enqueue(task("m1", "KALECI")).await;

        let first = queue.claim().await.unwrap().unwrap();
        queue.retry(first.delivery_id, "CONTENTION").await.unwrap();

        assert!(queue.claim().await.unwrap().is_none());
        assert_eq!(queue.pending().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_delivery_is_rejected() {
        let queue = MemoryTaskQueue::new(RetryPolicy::default());
        assert!(matches!(
            queue.ack(99).await,
            Err(QueueError::UnknownDelivery(99))
        ));
    }

    #[tokio::test]
    async fn test_failed_ack_releases_delivery() {
        let queue = Arc::new(FailingAcks {
            inner: MemoryTaskQueue::new(instant_retries(3)),
            failures: AtomicU32::new(1),
        });
        let store = Arc::new(MemoryRosterStore::new());
        store.add_active_member(&MemberId::parse("m1").unwrap()).await;
        let orchestrator = AssignmentOrchestrator::new(store.clone(), OrchestratorConfig::default());
        let intake = TaskIntake::new(orchestrator, store.clone(), Arc::new(StaticSwitch::new(false)));
        let worker = IntakeWorker::new(intake, queue.clone(), IntakeWorkerConfig::default());
        queue.inner.enqueue(task("m1", "KALECI")).await;

        let err = worker.run_once().await.unwrap_err();
        assert!(matches!(err, QueueError::Backend(_)));
        assert_eq!(queue.inner.in_flight().await, 0);
        assert_eq!(queue.inner.pending().await, 1);
        assert!(!queue.inner.is_idle().await);

        let outcome = worker.run_once().await.unwrap();
        let Some(TaskOutcome::Completed(report)) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.reason, Some(crate::assign::PlacementReason::AlreadyAssigned));
        assert_eq!(queue.inner.acked().await, 1);
        assert!(queue.inner.is_idle().await);
        assert_eq!(store.assignments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_release_redelivers_immediately() {
        let queue = MemoryTaskQueue::new(instant_retries(3));
        queue.enqueue(task("m1", "KALECI")).await;

        let first = queue.claim().await.unwrap().unwrap();
        assert_eq!(queue.in_flight().await, 1);
        queue.release(first.delivery_id).await.unwrap();

        let second = queue.claim().await.unwrap().unwrap();
        assert_eq!(second.task, first.task);
        assert_eq!(second.attempt, 2);
        assert!(matches!(
            queue.release(first.delivery_id).await,
            Err(QueueError::UnknownDelivery(_))
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let queue = Arc::new(MemoryTaskQueue::new(instant_retries(3)));
        let (store, worker) = worker(queue.clone()).await;
        store.add_active_member(&MemberId::parse("m1").unwrap()).await;
        queue.enqueue(task("m1", "KALECI")).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while queue.acked().await == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.assignments().await.len(), 1);
    }
}
