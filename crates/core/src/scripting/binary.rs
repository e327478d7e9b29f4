//! Direct executable executor.
//!
//! Runs a hook file as its own program (its shebang or native format decides
//! the interpreter). The execute bit is checked before spawning so a
//! misconfigured hook fails with a clear error instead of `EACCES`.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use super::executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
use super::subprocess;

/// Executor for hooks that are executed directly.
pub struct BinaryExecutor;

impl ScriptExecutor for BinaryExecutor {
    async fn execute(
        &self,
        binary_path: &Path,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        let display = binary_path.display().to_string();

        let metadata = tokio::fs::metadata(binary_path)
            .await
            .map_err(|_| ScriptError::NotFound(display.clone()))?;

        let mode = metadata.permissions().mode();
        if mode & 0o111 == 0 {
            return Err(ScriptError::PermissionDenied(format!(
                "{display} is not executable (mode {mode:#o})"
            )));
        }

        let mut cmd = tokio::process::Command::new(binary_path);
        subprocess::run_command(&mut cmd, input).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
