//! Hook name validation and script lookup.
//!
//! A hook is addressed by a `/`-separated name (e.g. `deploy/site`) and maps
//! onto an executable file below the configured scripts directory. Names are
//! validated before they ever touch the filesystem, so a trigger can never
//! escape the scripts directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum length of a hook name in bytes.
pub const MAX_HOOK_NAME_LEN: usize = 255;

/// One or more `/`-separated segments of ASCII letters, digits, `_` and `-`.
const HOOK_NAME_PATTERN: &str = r"^[A-Za-z0-9_-]+(/[A-Za-z0-9_-]+)*$";

static HOOK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOOK_NAME_PATTERN).expect("valid regex"));

/// Extension that marks a hook as a bash script.
const SHELL_EXTENSION: &str = "sh";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check that `name` is a well-formed hook name.
///
/// Rejects empty names, names over [`MAX_HOOK_NAME_LEN`] bytes, absolute
/// paths, `.`/`..` segments and any character outside `[A-Za-z0-9_-/]`.
pub fn validate_hook_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation("hook name is empty".to_string()));
    }
    if name.len() > MAX_HOOK_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "hook name exceeds {MAX_HOOK_NAME_LEN} bytes"
        )));
    }
    if !HOOK_NAME_RE.is_match(name) {
        return Err(CoreError::Validation(format!(
            "invalid hook name '{name}': segments may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// How a hook script is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `.sh` file, run through `bash`.
    Shell,
    /// Any other file, executed directly (must carry the execute bit).
    Binary,
}

impl ScriptKind {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(SHELL_EXTENSION) => Self::Shell,
            _ => Self::Binary,
        }
    }
}

/// A hook resolved to a concrete script on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookScript {
    /// The validated hook name the script was resolved from.
    pub name: String,
    /// Absolute or scripts-dir-relative path of the script.
    pub path: PathBuf,
    /// Launch strategy derived from the file extension.
    pub kind: ScriptKind,
}

/// Maps hook names onto scripts below a root directory.
#[derive(Debug, Clone)]
pub struct HookResolver {
    scripts_dir: PathBuf,
}

impl HookResolver {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Resolve `name` to a script.
    ///
    /// Tries `<scripts_dir>/<name>` first, then `<scripts_dir>/<name>.sh`.
    /// Directories never match.
    pub async fn resolve(&self, name: &str) -> Result<HookScript, CoreError> {
        validate_hook_name(name)?;

        let exact = self.scripts_dir.join(name);
        let with_extension = self.scripts_dir.join(format!("{name}.{SHELL_EXTENSION}"));

        for candidate in [exact, with_extension] {
            if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
                if metadata.is_file() {
                    let kind = ScriptKind::from_path(&candidate);
                    return Ok(HookScript {
                        name: name.to_string(),
                        path: candidate,
                        kind,
                    });
                }
            }
        }

        Err(CoreError::NotFound {
            entity: "Hook",
            id: name.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
