//! Shell script executor.
//!
//! Spawns `bash` with the script path as its argument, piping the JSON
//! payload to stdin and capturing stdout/stderr.

use std::path::Path;

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

/// Executor for `.sh` hooks.
pub struct ShellExecutor;

impl ScriptExecutor for ShellExecutor {
    async fn execute(
        &self,
        script_path: &Path,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        if tokio::fs::metadata(script_path).await.is_err() {
            return Err(ScriptError::NotFound(script_path.display().to_string()));
        }

        let mut cmd = tokio::process::Command::new("bash");
        cmd.arg(script_path);
        subprocess::run_command(&mut cmd, input).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
