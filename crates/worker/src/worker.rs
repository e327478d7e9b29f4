//! A single execution unit of the pool.
//!
//! Each worker loops `dequeue → run → report` until the queue is closed and
//! drained, or until the pool's hard-cancel token fires. Workers only share
//! the queue, the stats counters, and the reporter; they never talk to one
//! another.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::JobExecutionError;
use crate::job::{Job, JobResult};
use crate::queue::JobQueue;
use crate::reporter::JobReporter;
use crate::stats::DispatcherStats;

pub struct Worker {
    id: usize,
    queue: JobQueue,
    reporter: Arc<dyn JobReporter>,
    stats: Arc<DispatcherStats>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: JobQueue,
        reporter: Arc<dyn JobReporter>,
        stats: Arc<DispatcherStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            queue,
            reporter,
            stats,
            cancel,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Run until the queue is closed and empty, or the pool is cancelled.
    pub async fn run(self) {
        tracing::debug!(worker_id = self.id, "Worker started");

        loop {
            let job = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                next = self.queue.dequeue() => match next {
                    Some(job) => job,
                    None => break,
                },
            };

            if !self.process(job).await {
                break;
            }
        }

        tracing::debug!(worker_id = self.id, "Worker exited");
    }

    /// Execute one claimed job. Returns `false` when the job was abandoned
    /// by a hard cancel and the worker must stop.
    async fn process(&self, job: Job) -> bool {
        self.stats.record_started();
        self.reporter.job_started(self.id, &job).await;
        tracing::debug!(
            worker_id = self.id,
            job_id = %job.id(),
            hook = job.hook(),
            handler = job.handler().name(),
            "Job claimed",
        );

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(JobExecutionError::Abandoned),
            result = execute(&job) => result,
        };
        let elapsed = started.elapsed();

        match &result {
            Ok(output) => tracing::info!(
                worker_id = self.id,
                job_id = %job.id(),
                hook = job.hook(),
                exit_code = ?output.exit_code,
                elapsed_ms = elapsed.as_millis() as u64,
                "Job succeeded",
            ),
            Err(JobExecutionError::Abandoned) => tracing::warn!(
                worker_id = self.id,
                job_id = %job.id(),
                hook = job.hook(),
                "Job abandoned by forced shutdown",
            ),
            Err(e) => tracing::warn!(
                worker_id = self.id,
                job_id = %job.id(),
                hook = job.hook(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Job failed",
            ),
        }

        let abandoned = matches!(result, Err(JobExecutionError::Abandoned));
        self.stats.record_finished(result.is_ok());
        self.reporter
            .job_finished(self.id, &job, &result, elapsed)
            .await;

        !abandoned
    }
}

/// Run the job's handler, enforcing its timeout and containing panics.
async fn execute(job: &Job) -> JobResult {
    let run = AssertUnwindSafe(job.handler().run(job)).catch_unwind();

    let caught = match job.timeout() {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(caught) => caught,
            Err(_elapsed) => return Err(JobExecutionError::TimedOut { after: limit }),
        },
        None => run.await,
    };

    caught.unwrap_or_else(|panic| Err(JobExecutionError::Panicked(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
