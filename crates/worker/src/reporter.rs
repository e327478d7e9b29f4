//! Outcome reporting port.
//!
//! Workers surface every job they claim through a [`JobReporter`]. The API
//! server plugs in its status board; tests plug in recorders.

use std::time::Duration;

use async_trait::async_trait;

use crate::job::{Job, JobResult};

#[async_trait]
pub trait JobReporter: Send + Sync + 'static {
    /// Called after a worker claimed `job`, before its handler runs.
    async fn job_started(&self, worker_id: usize, job: &Job);

    /// Called once per claimed job with its final result.
    async fn job_finished(&self, worker_id: usize, job: &Job, result: &JobResult, elapsed: Duration);
}

/// Reporter that discards everything. Worker logging still happens.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

#[async_trait]
impl JobReporter for NoopReporter {
    async fn job_started(&self, _worker_id: usize, _job: &Job) {}

    async fn job_finished(
        &self,
        _worker_id: usize,
        _job: &Job,
        _result: &JobResult,
        _elapsed: Duration,
    ) {
    }
}
