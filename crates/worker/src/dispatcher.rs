//! Worker pool lifecycle: start, submit, graceful shutdown.
//!
//! The dispatcher is an explicitly constructed value, shared as
//! `Arc<Dispatcher>` between the HTTP handlers and the shutdown coordinator.
//!
//! State lives in an `AtomicU8` so `submit` never takes a lock. `start` and
//! `shutdown` are serialized by a lifecycle mutex and move the state with
//! compare-and-set, so exactly one caller wins each transition.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::DispatchError;
use crate::job::{Job, JobId};
use crate::queue::{EnqueueError, JobQueue, QueueCapacity};
use crate::reporter::JobReporter;
use crate::stats::{DispatcherStats, StatsSnapshot};
use crate::worker::Worker;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DispatcherState {
    /// Constructed, no workers yet.
    Idle = 0,
    /// Workers running, jobs accepted.
    Running = 1,
    /// Shutdown in progress: no new jobs, queued jobs still run.
    Draining = 2,
    /// All workers exited after draining the queue.
    Stopped = 3,
    /// Shutdown hit its deadline (or was forced) and abandoned work.
    TimedOut = 4,
}

impl DispatcherState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::TimedOut => "timed_out",
        }
    }

    /// `true` once shutdown has begun; the dispatcher never accepts jobs again.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Draining | Self::Stopped | Self::TimedOut)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            3 => Self::Stopped,
            _ => Self::TimedOut,
        }
    }
}

impl std::fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a shutdown that drained every accepted job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Jobs that succeeded over the dispatcher's lifetime.
    pub completed: u64,
    /// Jobs that failed over the dispatcher's lifetime.
    pub failed: u64,
    /// Time spent draining.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

mod duration_ms {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

struct WorkerPool {
    queue: JobQueue,
    tracker: TaskTracker,
    cancel: CancellationToken,
    size: usize,
}

enum DrainOutcome {
    Drained,
    DeadlineHit,
    Forced,
}

pub struct Dispatcher {
    state: AtomicU8,
    lifecycle: Mutex<()>,
    capacity: QueueCapacity,
    reporter: Arc<dyn JobReporter>,
    stats: Arc<DispatcherStats>,
    pool: OnceLock<WorkerPool>,
}

impl Dispatcher {
    /// Dispatcher with the default bounded queue.
    pub fn new(reporter: Arc<dyn JobReporter>) -> Self {
        Self::with_capacity(QueueCapacity::default(), reporter)
    }

    pub fn with_capacity(capacity: QueueCapacity, reporter: Arc<dyn JobReporter>) -> Self {
        Self {
            state: AtomicU8::new(DispatcherState::Idle as u8),
            lifecycle: Mutex::new(()),
            capacity,
            reporter,
            stats: Arc::new(DispatcherStats::default()),
            pool: OnceLock::new(),
        }
    }

    /// Spawn `pool_size` workers on the current Tokio runtime.
    ///
    /// Succeeds at most once per dispatcher. Must be called from within a
    /// runtime context.
    pub fn start(&self, pool_size: usize) -> Result<(), DispatchError> {
        if pool_size == 0 {
            return Err(DispatchError::InvalidPoolSize);
        }

        let _guard = self.lock_lifecycle();
        match self.state() {
            DispatcherState::Idle => {}
            DispatcherState::Running => return Err(DispatchError::AlreadyStarted),
            _ => return Err(DispatchError::DispatcherClosed),
        }

        let pool = WorkerPool {
            queue: JobQueue::new(self.capacity),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            size: pool_size,
        };
        if self.pool.set(pool).is_err() {
            return Err(DispatchError::AlreadyStarted);
        }
        let pool = self.pool.get().ok_or(DispatchError::NotStarted)?;

        for id in 0..pool_size {
            let worker = Worker::new(
                id,
                pool.queue.clone(),
                Arc::clone(&self.reporter),
                Arc::clone(&self.stats),
                pool.cancel.clone(),
            );
            pool.tracker.spawn(worker.run());
        }

        self.transition(DispatcherState::Idle, DispatcherState::Running)?;

        tracing::info!(
            workers = pool_size,
            queue_capacity = ?self.capacity,
            "Dispatcher started",
        );
        Ok(())
    }

    /// Hand `job` to the pool without waiting for it to run.
    pub fn submit(&self, job: Job) -> Result<JobId, DispatchError> {
        let pool = match self.state() {
            DispatcherState::Running => self.pool.get().ok_or(DispatchError::NotStarted)?,
            DispatcherState::Idle => return Err(DispatchError::NotStarted),
            _ => return Err(DispatchError::DispatcherClosed),
        };

        let job_id = job.id();
        let hook = job.hook().to_string();
        pool.queue.enqueue(job).map_err(|e| match e {
            // Lost the race against a concurrent shutdown.
            EnqueueError::Closed => DispatchError::DispatcherClosed,
            EnqueueError::Full { capacity } => {
                tracing::warn!(hook = %hook, capacity, "Job queue full, rejecting job");
                DispatchError::QueueFull { capacity }
            }
        })?;

        self.stats.record_submitted();
        tracing::debug!(job_id = %job_id, hook = %hook, "Job submitted");
        Ok(job_id)
    }

    /// Stop accepting jobs and wait up to `timeout` for the pool to drain.
    pub async fn shutdown(&self, timeout: Duration) -> Result<ShutdownReport, DispatchError> {
        self.shutdown_with_abort(timeout, std::future::pending::<()>())
            .await
    }

    /// Like [`shutdown`](Self::shutdown), but abandons in-flight work as soon
    /// as `abort` resolves.
    ///
    /// On the clean path every job accepted before this call has reached a
    /// terminal outcome and the state is `Stopped`. On deadline or abort the
    /// pool's cancel token fires, running handlers are dropped, and the state
    /// is `TimedOut`.
    pub async fn shutdown_with_abort<F>(
        &self,
        timeout: Duration,
        abort: F,
    ) -> Result<ShutdownReport, DispatchError>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();

        let Some(pool) = self.begin_drain()? else {
            tracing::info!("Dispatcher shut down before start");
            return Ok(ShutdownReport {
                elapsed: started.elapsed(),
                ..ShutdownReport::default()
            });
        };

        tracing::info!(
            pending = pool.queue.len(),
            in_flight = self.stats.in_flight(),
            timeout_ms = timeout.as_millis() as u64,
            "Dispatcher draining",
        );

        // Idle workers wake on close; busy ones finish their job, then drain.
        pool.queue.close();
        pool.tracker.close();

        let outcome = tokio::select! {
            biased;
            () = pool.tracker.wait() => DrainOutcome::Drained,
            () = tokio::time::sleep(timeout) => DrainOutcome::DeadlineHit,
            () = abort => DrainOutcome::Forced,
        };

        let _guard = self.lock_lifecycle();
        match outcome {
            DrainOutcome::Drained => {
                self.transition(DispatcherState::Draining, DispatcherState::Stopped)?;
                let snapshot = self.stats.snapshot();
                let report = ShutdownReport {
                    completed: snapshot.succeeded,
                    failed: snapshot.failed,
                    elapsed: started.elapsed(),
                };
                tracing::info!(
                    completed = report.completed,
                    failed = report.failed,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Dispatcher stopped",
                );
                Ok(report)
            }
            DrainOutcome::DeadlineHit | DrainOutcome::Forced => {
                let in_flight = self.stats.in_flight();
                let pending = pool.queue.len();
                pool.cancel.cancel();
                self.transition(DispatcherState::Draining, DispatcherState::TimedOut)?;

                if matches!(outcome, DrainOutcome::Forced) {
                    tracing::warn!(in_flight, pending, "Dispatcher shutdown forced");
                    Err(DispatchError::ShutdownForced { in_flight, pending })
                } else {
                    tracing::warn!(
                        in_flight,
                        pending,
                        timeout_ms = timeout.as_millis() as u64,
                        "Dispatcher shutdown timed out",
                    );
                    Err(DispatchError::ShutdownTimedOut {
                        timeout,
                        in_flight,
                        pending,
                    })
                }
            }
        }
    }

    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of workers spawned by `start` (0 before start).
    pub fn pool_size(&self) -> usize {
        self.pool.get().map_or(0, |pool| pool.size)
    }

    /// Jobs accepted but not yet claimed by a worker.
    pub fn queue_len(&self) -> usize {
        self.pool.get().map_or(0, |pool| pool.queue.len())
    }

    pub fn queue_capacity(&self) -> QueueCapacity {
        self.capacity
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Move into `Draining` (or straight to `Stopped` if never started).
    ///
    /// Returns the pool to drain, `None` when there is nothing to drain.
    fn begin_drain(&self) -> Result<Option<&WorkerPool>, DispatchError> {
        let _guard = self.lock_lifecycle();
        match self.state() {
            DispatcherState::Idle => {
                self.transition(DispatcherState::Idle, DispatcherState::Stopped)?;
                Ok(None)
            }
            DispatcherState::Running => {
                self.transition(DispatcherState::Running, DispatcherState::Draining)?;
                self.pool.get().map(Some).ok_or(DispatchError::NotStarted)
            }
            _ => Err(DispatchError::DispatcherClosed),
        }
    }

    fn transition(&self, from: DispatcherState, to: DispatcherState) -> Result<(), DispatchError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| DispatchError::DispatcherClosed)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state())
            .field("capacity", &self.capacity)
            .field("pool_size", &self.pool_size())
            .field("queue_len", &self.queue_len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
