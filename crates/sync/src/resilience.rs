//! Retry, offline queueing and replay for API mutations.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fitfind_core::{FitFindApi, FitFindError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cancel::CancelScope;
use crate::config::SyncConfig;
use crate::events::{EventBus, SyncEvent};
use crate::network::NetworkMonitor;
use crate::offline_queue::{OfflineQueue, PendingOperation, QueuedMutation};
use crate::outcome::OperationOutcome;
use crate::retry::{RetryPolicy, retry};

/// Counts from one pass over the offline queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub replayed: usize,
    pub requeued: usize,
    pub dropped: usize,
}

impl ReplayReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.replayed + self.requeued + self.dropped
    }
}

#[derive(Debug)]
pub struct Resilience {
    monitor: NetworkMonitor,
    policy: RetryPolicy,
    queue: Arc<OfflineQueue>,
    events: EventBus,
    /// Replays a queued operation may fail before it is dropped.
    max_replays: u32,
    replaying: AtomicBool,
}

struct ReplayGuard<'a>(&'a AtomicBool);

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Resilience {
    #[must_use]
    pub fn new(
        config: &SyncConfig,
        queue: Arc<OfflineQueue>,
        events: EventBus,
        monitor: NetworkMonitor,
    ) -> Self {
        Self {
            monitor,
            policy: config.retry_policy(),
            queue,
            events,
            max_replays: config.max_retries.max(1),
            replaying: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    #[must_use]
    pub const fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Update connectivity and announce the change on the event bus.
    pub fn set_online(&self, online: bool) {
        if self.monitor.set_online(online) {
            tracing::info!(online, "connectivity changed");
            self.events.publish(SyncEvent::Connectivity { online });
        }
    }

    /// Run `op` with retry. Fails fast with `Offline` while disconnected.
    ///
    /// A connection failure that survives every attempt marks the client offline.
    ///
    /// # Errors
    /// Returns `Offline`, or the error of the last attempt.
    pub async fn execute<T, F, Fut>(&self, description: &str, op: F) -> Result<T, FitFindError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FitFindError>>,
    {
        if !self.is_online() {
            return Err(FitFindError::Offline);
        }
        let result = retry(&self.policy, description, op).await;
        if matches!(result, Err(FitFindError::Network(_))) {
            self.set_online(false);
        }
        result
    }

    /// Like [`Self::execute`], but queues `mutation` instead of failing when
    /// the client is or goes offline.
    pub async fn execute_or_queue<T, F, Fut>(
        &self,
        description: &str,
        mutation: QueuedMutation,
        op: F,
    ) -> OperationOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FitFindError>>,
    {
        match self.execute(description, op).await {
            Ok(value) => OperationOutcome::Success(value),
            Err(FitFindError::Offline | FitFindError::Network(_)) => {
                OperationOutcome::Queued(self.enqueue(description, mutation))
            },
            Err(err) => OperationOutcome::Failed(err),
        }
    }

    /// Append `mutation` to the offline queue. Returns the operation id.
    pub fn enqueue(&self, description: &str, mutation: QueuedMutation) -> Uuid {
        let op = PendingOperation::new(description, mutation, self.max_replays);
        let operation_id = op.id;
        tracing::info!(
            operation = description,
            id = %operation_id,
            kind = op.kind.as_str(),
            "queued for offline replay"
        );
        self.queue.push(op);
        self.events.publish(SyncEvent::OperationQueued {
            operation_id,
            description: description.to_owned(),
        });
        operation_id
    }

    /// Replay the offline queue in FIFO order, one attempt per operation.
    ///
    /// Each operation stays in the queue, and on disk, until it resolves.
    /// Stops early if the client goes offline. A second call while a replay
    /// is running returns an empty report.
    pub async fn replay(&self, api: &dyn FitFindApi) -> ReplayReport {
        if self.replaying.swap(true, Ordering::AcqRel) {
            tracing::debug!("replay already running, skipping");
            return ReplayReport::default();
        }
        let _guard = ReplayGuard(&self.replaying);

        let mut report = ReplayReport::default();
        for mut op in self.queue.snapshot() {
            if !self.is_online() {
                break;
            }

            match op.mutation.apply(api).await {
                Ok(()) => {
                    tracing::info!(operation = %op.description, id = %op.id, "replayed");
                    self.queue.remove(op.id);
                    report.replayed += 1;
                },
                Err(err) if op.mutation.is_already_applied(&err) => {
                    tracing::info!(operation = %op.description, id = %op.id, "already applied");
                    self.queue.remove(op.id);
                    report.replayed += 1;
                },
                Err(err) if err.is_retryable() => {
                    op.retry_count = op.retry_count.saturating_add(1);
                    if matches!(err, FitFindError::Network(_)) {
                        self.set_online(false);
                    }
                    if op.is_exhausted() {
                        self.queue.remove(op.id);
                        self.drop_operation(&op, &err);
                        report.dropped += 1;
                    } else {
                        tracing::warn!(
                            operation = %op.description,
                            id = %op.id,
                            attempt = op.retry_count,
                            max_attempts = op.max_retries,
                            error = %err,
                            "replay failed, keeping in queue"
                        );
                        self.queue.update(&op);
                        report.requeued += 1;
                    }
                },
                Err(err) => {
                    self.queue.remove(op.id);
                    self.drop_operation(&op, &err);
                    report.dropped += 1;
                },
            }
        }

        if report.total() > 0 {
            tracing::info!(
                replayed = report.replayed,
                requeued = report.requeued,
                dropped = report.dropped,
                "offline queue replay finished"
            );
        }
        report
    }

    fn drop_operation(&self, op: &PendingOperation, err: &FitFindError) {
        tracing::error!(
            operation = %op.description,
            id = %op.id,
            retries = op.retry_count,
            error = %err,
            "dropping queued operation"
        );
        self.events.publish(SyncEvent::OperationDropped {
            operation_id: op.id,
            description: op.description.clone(),
            error: err.to_string(),
        });
    }

    /// Replay the queue every time connectivity goes from offline to online.
    ///
    /// The task ends when `scope` is cancelled.
    pub fn spawn_replay_on_reconnect(
        self: &Arc<Self>,
        api: Arc<dyn FitFindApi>,
        scope: CancelScope,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut rx = self.monitor.subscribe();
        tokio::spawn(async move {
            let mut was_online = *rx.borrow_and_update();
            loop {
                tokio::select! {
                    biased;
                    () = scope.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *rx.borrow_and_update();
                        if online && !was_online && !this.queue.is_empty() {
                            this.replay(api.as_ref()).await;
                        }
                        was_online = online;
                    },
                }
            }
            tracing::debug!("reconnect replay task stopped");
        })
    }
}
