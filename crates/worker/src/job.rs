//! Jobs and the handler port that executes them.
//!
//! A [`Job`] is immutable once built: fields are private and only exposed by
//! reference. It is not `Clone`, so a job moved into the queue can be claimed
//! by exactly one worker.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookd_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobExecutionError;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Time-ordered (UUID v7) job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Handler port
// ---------------------------------------------------------------------------

/// Output of a successfully executed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutput {
    /// Exit code for process-backed handlers.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Result of running one job.
pub type JobResult = Result<JobOutput, JobExecutionError>;

/// The action a job triggers.
///
/// Implementations own their retry policy; the dispatch core never retries.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Handler reference used in logs (e.g. the script path).
    fn name(&self) -> &str;

    /// Execute `job`. Must not block the async runtime.
    async fn run(&self, job: &Job) -> JobResult;
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One unit of dispatched work: a triggered hook plus its payload.
pub struct Job {
    id: JobId,
    hook: String,
    payload: serde_json::Value,
    env_vars: Vec<(String, String)>,
    handler: Arc<dyn JobHandler>,
    submitted_at: Timestamp,
    timeout: Option<Duration>,
}

impl Job {
    /// Start building a job for `hook`, executed by `handler`.
    pub fn builder(hook: impl Into<String>, handler: Arc<dyn JobHandler>) -> JobBuilder {
        JobBuilder {
            hook: hook.into(),
            handler,
            payload: serde_json::Value::Null,
            env_vars: Vec::new(),
            timeout: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env_vars
    }

    pub fn handler(&self) -> &Arc<dyn JobHandler> {
        &self.handler
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("hook", &self.hook)
            .field("handler", &self.handler.name())
            .field("submitted_at", &self.submitted_at)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Job`]. The id and submission timestamp are assigned by
/// [`build`](JobBuilder::build).
pub struct JobBuilder {
    hook: String,
    handler: Arc<dyn JobHandler>,
    payload: serde_json::Value,
    env_vars: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl JobBuilder {
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub fn env_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env_vars.extend(vars);
        self
    }

    /// Per-job execution limit, enforced by the worker.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Job {
        Job {
            id: JobId::new(),
            hook: self.hook,
            payload: self.payload,
            env_vars: self.env_vars,
            handler: self.handler,
            submitted_at: chrono::Utc::now(),
            timeout: self.timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl JobHandler for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        async fn run(&self, _job: &Job) -> JobResult {
            Ok(JobOutput::default())
        }
    }

    #[test]
    fn builder_sets_all_fields() {
        let before = chrono::Utc::now();
        let job = Job::builder("deploy/site", Arc::new(Noop))
            .payload(serde_json::json!({"ref": "main"}))
            .env_var("HOOK_METHOD", "POST")
            .timeout(Duration::from_secs(3))
            .build();

        assert_eq!(job.hook(), "deploy/site");
        assert_eq!(job.payload()["ref"], "main");
        assert_eq!(job.env_vars(), &[("HOOK_METHOD".to_string(), "POST".to_string())]);
        assert_eq!(job.timeout(), Some(Duration::from_secs(3)));
        assert!(job.submitted_at() >= before);
        assert_eq!(job.handler().name(), "noop");
    }

    #[test]
    fn job_ids_are_unique_v7() {
        let first = JobId::new();
        let second = JobId::new();
        assert_ne!(first, second);
        assert_eq!(first.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().expect("parse job id");
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn debug_output_names_handler() {
        let job = Job::builder("echo", Arc::new(Noop)).build();
        let debug = format!("{job:?}");
        assert!(debug.contains("echo"));
        assert!(debug.contains("noop"));
    }
}
