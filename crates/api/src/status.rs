//! In-memory job status board.
//!
//! Records every job accepted over HTTP and follows it through the worker
//! pool by implementing [`JobReporter`]. The board is bounded: once it holds
//! more than its capacity, the oldest records are evicted first.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use hookd_core::types::Timestamp;
use hookd_worker::{Job, JobExecutionError, JobId, JobReporter, JobResult};
use serde::Serialize;
use tokio::sync::RwLock;

/// Records kept before the oldest are evicted.
pub const DEFAULT_BOARD_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

/// Status of one job as exposed by `GET /api/v1/jobs/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub hook: String,
    pub status: JobStatus,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub worker_id: Option<usize>,
    pub exit_code: Option<i32>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<JobId, JobRecord>,
    order: VecDeque<JobId>,
}

pub struct JobStatusBoard {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl JobStatusBoard {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BOARD_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Register `job` as pending. Call before handing it to the dispatcher.
    pub async fn record_submitted(&self, job: &Job) {
        let record = JobRecord {
            job_id: job.id(),
            hook: job.hook().to_string(),
            status: JobStatus::Pending,
            submitted_at: job.submitted_at(),
            started_at: None,
            finished_at: None,
            worker_id: None,
            exit_code: None,
            duration_ms: None,
            error: None,
        };

        let mut inner = self.inner.write().await;
        inner.order.push_back(record.job_id);
        inner.records.insert(record.job_id, record);

        while inner.records.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.records.remove(&oldest);
        }
    }

    /// Drop the record of a job the dispatcher refused.
    pub async fn forget(&self, job_id: JobId) {
        let mut inner = self.inner.write().await;
        if inner.records.remove(&job_id).is_some() {
            inner.order.retain(|id| *id != job_id);
        }
    }

    pub async fn get(&self, job_id: JobId) -> Option<JobRecord> {
        self.inner.read().await.records.get(&job_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for JobStatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobReporter for JobStatusBoard {
    async fn job_started(&self, worker_id: usize, job: &Job) {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.records.get_mut(&job.id()) {
            record.status = JobStatus::Running;
            record.started_at = Some(chrono::Utc::now());
            record.worker_id = Some(worker_id);
        }
    }

    async fn job_finished(
        &self,
        _worker_id: usize,
        job: &Job,
        result: &JobResult,
        elapsed: Duration,
    ) {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.records.get_mut(&job.id()) else {
            return;
        };

        record.finished_at = Some(chrono::Utc::now());
        record.duration_ms = Some(elapsed.as_millis() as u64);
        match result {
            Ok(output) => {
                record.status = JobStatus::Succeeded;
                record.exit_code = output.exit_code;
            }
            Err(e) => {
                record.status = match e {
                    JobExecutionError::TimedOut { .. } => JobStatus::TimedOut,
                    _ => JobStatus::Failed,
                };
                if let JobExecutionError::NonZeroExit { exit_code, .. } = e {
                    record.exit_code = Some(*exit_code);
                }
                record.error = Some(e.to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
