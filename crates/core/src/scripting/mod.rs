//! Hook script execution.
//!
//! Provides the shell (`bash`) and direct-executable runtimes. Subprocess
//! management is pure (no HTTP, no dispatcher state) so it can be tested in
//! isolation.

pub mod binary;
pub mod executor;
pub mod shell;
pub mod subprocess;

pub use binary::BinaryExecutor;
pub use executor::{ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
pub use shell::ShellExecutor;
