#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hookd_worker::{
    Dispatcher, Job, JobExecutionError, JobHandler, JobId, JobOutput, JobReporter, JobResult,
    QueueCapacity,
};

/// Handler that sleeps for a fixed duration and tracks how many runs
/// overlapped.
pub struct SleepHandler {
    duration: Duration,
    running: AtomicUsize,
    max_running: AtomicUsize,
    finished: AtomicUsize,
}

impl SleepHandler {
    pub fn new(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            duration,
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        })
    }

    /// Highest number of jobs observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobHandler for SleepHandler {
    fn name(&self) -> &str {
        "sleep"
    }

    async fn run(&self, _job: &Job) -> JobResult {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.duration).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(JobOutput::default())
    }
}

/// Handler that always fails.
pub struct FailingHandler;

#[async_trait]
impl JobHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _job: &Job) -> JobResult {
        Err(JobExecutionError::Failed("simulated failure".into()))
    }
}

/// Handler that always panics.
pub struct PanickingHandler;

#[async_trait]
impl JobHandler for PanickingHandler {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn run(&self, _job: &Job) -> JobResult {
        panic!("handler exploded");
    }
}

/// One `job_finished` call as seen by [`RecordingReporter`].
#[derive(Debug, Clone)]
pub struct Finished {
    pub worker_id: usize,
    pub job_id: JobId,
    pub hook: String,
    pub outcome: Result<(), String>,
}

/// Reporter that remembers every start and finish event.
#[derive(Default)]
pub struct RecordingReporter {
    started: Mutex<Vec<JobId>>,
    finished: Mutex<Vec<Finished>>,
}

impl RecordingReporter {
    pub fn started(&self) -> Vec<JobId> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<Finished> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobReporter for RecordingReporter {
    async fn job_started(&self, _worker_id: usize, job: &Job) {
        self.started.lock().unwrap().push(job.id());
    }

    async fn job_finished(
        &self,
        worker_id: usize,
        job: &Job,
        result: &JobResult,
        _elapsed: Duration,
    ) {
        self.finished.lock().unwrap().push(Finished {
            worker_id,
            job_id: job.id(),
            hook: job.hook().to_string(),
            outcome: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        });
    }
}

/// Build a dispatcher with a recording reporter.
pub fn recording_dispatcher(capacity: QueueCapacity) -> (Arc<Dispatcher>, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let dispatcher = Arc::new(Dispatcher::with_capacity(capacity, reporter.clone()));
    (dispatcher, reporter)
}

pub fn job(hook: &str, handler: Arc<dyn JobHandler>) -> Job {
    Job::builder(hook, handler).build()
}
