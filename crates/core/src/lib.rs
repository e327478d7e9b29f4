//! hookd domain primitives.
//!
//! Everything here is free of HTTP concerns so the dispatch core and the API
//! server can share it:
//!
//! - [`error`]: [`CoreError`], the domain error shared by both layers.
//! - [`hooks`]: hook name validation and script lookup.
//! - [`scripting`]: subprocess executors for shell scripts and binaries.
//! - [`signature`]: HMAC-SHA256 verification of trigger payloads.

pub mod error;
pub mod hooks;
pub mod scripting;
pub mod signature;
pub mod types;

pub use error::CoreError;
pub use hooks::{HookResolver, HookScript, ScriptKind};
