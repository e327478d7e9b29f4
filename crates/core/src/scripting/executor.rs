//! Script execution interface and shared types.
//!
//! Defines [`ScriptExecutor`], the trait both runtime executors implement,
//! along with [`ScriptInput`], [`ScriptOutput`], and [`ScriptError`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input data passed to a hook script.
#[derive(Debug, Clone)]
pub struct ScriptInput {
    /// JSON payload piped to the script's stdin.
    pub data: Value,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<String>,
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
}

/// Captured output from a script execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptOutput {
    /// Complete stdout captured from the process.
    pub stdout: String,
    /// Complete stderr captured from the process.
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that prevent a script from producing an exit status.
///
/// A script that runs and exits non-zero is *not* an error at this layer;
/// it comes back as a [`ScriptOutput`] with the exit code set.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script file was not found at the specified path.
    #[error("Script not found: {0}")]
    NotFound(String),

    /// The script file exists but lacks execute permissions.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The script exceeded its configured timeout and was killed.
    #[error("Script timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed wall-clock time before the process was killed.
        elapsed_ms: u64,
    },

    /// An I/O error occurred while spawning or communicating with the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait implemented by the script runtime executors (shell, binary).
pub trait ScriptExecutor: Send + Sync {
    /// Execute the script at `script_path` with the given `input`.
    fn execute(
        &self,
        script_path: &Path,
        input: ScriptInput,
    ) -> impl std::future::Future<Output = Result<ScriptOutput, ScriptError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
