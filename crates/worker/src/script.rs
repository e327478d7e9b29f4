//! [`JobHandler`] that runs a resolved hook script.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use hookd_core::hooks::{HookScript, ScriptKind};
use hookd_core::scripting::{
    BinaryExecutor, ScriptError, ScriptExecutor, ScriptInput, ScriptOutput, ShellExecutor,
};

use crate::error::JobExecutionError;
use crate::job::{Job, JobHandler, JobId, JobOutput, JobResult};

/// Script limit applied when the job itself carries no timeout.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs one hook script per job.
///
/// The job payload is piped to the script's stdin as JSON; the job's env vars
/// are passed through together with `HOOK_ID` and `HOOK_NAME`.
#[derive(Debug, Clone)]
pub struct ScriptJobHandler {
    script: HookScript,
    display: String,
    log_dir: Option<PathBuf>,
    default_timeout: Duration,
}

impl ScriptJobHandler {
    pub fn new(script: HookScript) -> Self {
        let display = script.path.display().to_string();
        Self {
            script,
            display,
            log_dir: None,
            default_timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    /// Write each job's output to `<dir>/<job_id>.log`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn script(&self) -> &HookScript {
        &self.script
    }

    fn input_for(&self, job: &Job) -> ScriptInput {
        let mut env_vars = job.env_vars().to_vec();
        env_vars.push(("HOOK_ID".to_string(), job.id().to_string()));
        env_vars.push(("HOOK_NAME".to_string(), job.hook().to_string()));

        ScriptInput {
            data: job.payload().clone(),
            env_vars,
            working_directory: None,
            timeout: job.timeout().unwrap_or(self.default_timeout),
        }
    }

    async fn execute(&self, input: ScriptInput) -> Result<ScriptOutput, ScriptError> {
        match self.script.kind {
            ScriptKind::Shell => ShellExecutor.execute(&self.script.path, input).await,
            ScriptKind::Binary => BinaryExecutor.execute(&self.script.path, input).await,
        }
    }

    async fn write_log(&self, job: &Job, outcome: &Result<ScriptOutput, ScriptError>) {
        let Some(dir) = &self.log_dir else {
            return;
        };

        let path = log_file_path(dir, job.id());
        let contents = render_log(job, outcome);
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, contents).await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(
                job_id = %job.id(),
                path = %path.display(),
                error = %e,
                "Failed to write hook log",
            );
        }
    }
}

#[async_trait]
impl JobHandler for ScriptJobHandler {
    fn name(&self) -> &str {
        &self.display
    }

    async fn run(&self, job: &Job) -> JobResult {
        let outcome = self.execute(self.input_for(job)).await;
        self.write_log(job, &outcome).await;

        match outcome {
            Ok(output) if output.success() => Ok(JobOutput {
                exit_code: Some(output.exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(output) => Err(JobExecutionError::NonZeroExit {
                exit_code: output.exit_code,
                stderr: output.stderr,
            }),
            Err(ScriptError::Timeout { elapsed_ms }) => Err(JobExecutionError::TimedOut {
                after: Duration::from_millis(elapsed_ms),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Location of the output log for `job_id` below `dir`.
pub fn log_file_path(dir: &Path, job_id: JobId) -> PathBuf {
    dir.join(format!("{job_id}.log"))
}

fn render_log(job: &Job, outcome: &Result<ScriptOutput, ScriptError>) -> String {
    let mut log = format!(
        "hook: {}\njob: {}\nsubmitted_at: {}\n",
        job.hook(),
        job.id(),
        job.submitted_at().to_rfc3339(),
    );
    match outcome {
        Ok(output) => {
            log.push_str(&format!(
                "exit_code: {}\nduration_ms: {}\n\n--- stdout ---\n{}\n--- stderr ---\n{}",
                output.exit_code, output.duration_ms, output.stdout, output.stderr,
            ));
        }
        Err(e) => log.push_str(&format!("error: {e}\n")),
    }
    log
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
