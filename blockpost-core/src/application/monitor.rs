use crate::application::lifecycle::{LifecycleObserver, NoopObserver, SkipReason};
use crate::application::signer::ResponseSigner;
use crate::application::submitter::TransactionSubmitter;
use crate::domain::RequestEvent;
use crate::foundation::{OperatorError, RequestId, DEFAULT_COMPLETED_CAPACITY};
use crate::infrastructure::config::AppConfig;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;

/// In-process record of which requests are being handled and which are done.
///
/// `pending` is the set of ids with a live `PendingGuard`; at most one guard exists per id.
/// `completed` is a bounded FIFO so a redelivered event for a finished request is ignored.
#[derive(Clone)]
pub struct RequestTracker {
    inner: Arc<Mutex<TrackerState>>,
}

struct TrackerState {
    pending: HashSet<RequestId>,
    completed: HashSet<RequestId>,
    completed_order: VecDeque<RequestId>,
    completed_capacity: usize,
}

impl RequestTracker {
    pub fn new(completed_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerState {
                pending: HashSet::new(),
                completed: HashSet::new(),
                completed_order: VecDeque::new(),
                completed_capacity: completed_capacity.max(1),
            })),
        }
    }

    /// Claims `id` for processing, or reports why it must be skipped.
    pub fn try_begin(&self, id: RequestId) -> Result<PendingGuard, SkipReason> {
        let mut state = self.inner.lock();
        if state.completed.contains(&id) {
            return Err(SkipReason::Completed);
        }
        if !state.pending.insert(id) {
            return Err(SkipReason::Pending);
        }
        Ok(PendingGuard { inner: Arc::clone(&self.inner), id, completed: false })
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.inner.lock().pending.contains(&id)
    }

    pub fn is_completed(&self, id: RequestId) -> bool {
        self.inner.lock().completed.contains(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn completed_len(&self) -> usize {
        self.inner.lock().completed.len()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETED_CAPACITY)
    }
}

/// Releases the pending entry on drop. `complete()` also remembers the id as finished.
pub struct PendingGuard {
    inner: Arc<Mutex<TrackerState>>,
    id: RequestId,
    completed: bool,
}

impl PendingGuard {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        state.pending.remove(&self.id);
        if self.completed && state.completed.insert(self.id) {
            state.completed_order.push_back(self.id);
            while state.completed_order.len() > state.completed_capacity {
                if let Some(evicted) = state.completed_order.pop_front() {
                    state.completed.remove(&evicted);
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MonitorSettings {
    pub max_concurrency: usize,
    pub completed_capacity: usize,
    pub shutdown_grace: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_concurrency: config.monitor.max_concurrency,
            completed_capacity: config.monitor.completed_capacity,
            shutdown_grace: config.monitor.shutdown_grace(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { max_concurrency: 4, completed_capacity: DEFAULT_COMPLETED_CAPACITY, shutdown_grace: Duration::from_secs(30) }
    }
}

/// What became of one event handed to `RequestMonitor::dispatch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Spawned,
    Skipped(SkipReason),
    /// Shutdown arrived before a worker was free; the request was left unprocessed.
    Interrupted,
}

/// Bounded worker pool turning request events into confirmed responses.
pub struct RequestMonitor {
    signer: ResponseSigner,
    submitter: Arc<TransactionSubmitter>,
    tracker: RequestTracker,
    permits: Arc<Semaphore>,
    settings: MonitorSettings,
    observer: Arc<dyn LifecycleObserver>,
}

type TaskResult = Result<(), OperatorError>;

impl RequestMonitor {
    pub fn new(signer: ResponseSigner, submitter: Arc<TransactionSubmitter>, settings: MonitorSettings) -> Self {
        Self {
            signer,
            submitter,
            tracker: RequestTracker::new(settings.completed_capacity),
            permits: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            settings,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Consumes events until the stream closes, shutdown is signalled, or a handler fails fatally.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<RequestEvent>, mut shutdown: watch::Receiver<bool>) -> TaskResult {
        info!(
            "request monitor started max_concurrency={} completed_capacity={}",
            self.settings.max_concurrency, self.settings.completed_capacity
        );
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut shutdown_open = true;
        if *shutdown.borrow() {
            return Ok(());
        }

        let outcome = loop {
            tokio::select! {
                changed = shutdown.changed(), if shutdown_open => match changed {
                    Ok(()) if *shutdown.borrow() => {
                        info!("request monitor stopping: shutdown requested in_flight={}", tasks.len());
                        break Ok(());
                    }
                    Ok(()) => {}
                    Err(_) => shutdown_open = false,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = flatten(joined) {
                        break Err(err);
                    }
                }
                received = events.recv() => match received {
                    Some(event) => match self.dispatch(event, &mut tasks, &mut shutdown).await {
                        Ok(Dispatch::Interrupted) => break Ok(()),
                        Ok(Dispatch::Spawned | Dispatch::Skipped(_)) => {}
                        Err(err) => break Err(err),
                    },
                    None => {
                        info!("request event stream closed in_flight={}", tasks.len());
                        break Ok(());
                    }
                },
            }
        };

        match outcome {
            Ok(()) => self.drain(&mut tasks).await,
            Err(err) => {
                error!("request monitor aborting on fatal error in_flight={} error={}", tasks.len(), err);
                tasks.abort_all();
                Err(err)
            }
        }
    }

    /// Deduplicates `event` and spawns its handler once a worker slot is free.
    ///
    /// While every worker is busy, finished handlers are still reaped and a shutdown signal
    /// still ends the wait; a fatal handler error is returned.
    pub async fn dispatch(
        self: &Arc<Self>,
        event: RequestEvent,
        tasks: &mut JoinSet<TaskResult>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Dispatch, OperatorError> {
        self.observer.on_request_observed(&event);
        let id = event.request_id();
        let guard = match self.tracker.try_begin(id) {
            Ok(guard) => guard,
            Err(reason) => {
                self.observer.on_duplicate_skipped(id, reason);
                return Ok(Dispatch::Skipped(reason));
            }
        };

        let mut shutdown_open = true;
        let permit = loop {
            tokio::select! {
                acquired = Arc::clone(&self.permits).acquire_owned() => match acquired {
                    Ok(permit) => break permit,
                    Err(_) => {
                        warn!("worker pool closed; dropping request request_id={}", id);
                        return Ok(Dispatch::Interrupted);
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => flatten(joined)?,
                changed = shutdown.changed(), if shutdown_open => match changed {
                    Ok(()) if *shutdown.borrow() => {
                        info!("shutdown requested while waiting for a worker request_id={} in_flight={}", id, tasks.len());
                        return Ok(Dispatch::Interrupted);
                    }
                    Ok(()) => {}
                    Err(_) => shutdown_open = false,
                },
            }
        };

        let monitor = Arc::clone(self);
        tasks.spawn(async move {
            let _permit = permit;
            monitor.process(event, guard).await
        });
        Ok(Dispatch::Spawned)
    }

    async fn process(&self, event: RequestEvent, guard: PendingGuard) -> TaskResult {
        let id = guard.id();
        let result = async {
            let response = self.signer.sign(&event.request)?;
            self.observer.on_response_signed(&response);
            self.submitter.submit(&response).await
        }
        .await;

        match result {
            Ok(outcome) => {
                self.observer.on_response_completed(id, &outcome);
                guard.complete();
                Ok(())
            }
            Err(err) => {
                self.observer.on_request_failed(id, &err);
                drop(guard);
                if err.is_fatal() {
                    Err(err)
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn drain(&self, tasks: &mut JoinSet<TaskResult>) -> TaskResult {
        if tasks.is_empty() {
            return Ok(());
        }
        debug!("draining request handlers in_flight={} grace_ms={}", tasks.len(), self.settings.shutdown_grace.as_millis());
        let drained = tokio::time::timeout(self.settings.shutdown_grace, async {
            while let Some(joined) = tasks.join_next().await {
                flatten(joined)?;
            }
            Ok(())
        })
        .await;
        match drained {
            Ok(result) => result,
            Err(_) => {
                warn!("shutdown grace elapsed; aborting request handlers remaining={}", tasks.len());
                tasks.abort_all();
                Ok(())
            }
        }
    }
}

fn flatten(joined: Result<TaskResult, tokio::task::JoinError>) -> TaskResult {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => {
            error!("request handler panicked error={}", err);
            Ok(())
        }
    }
}
