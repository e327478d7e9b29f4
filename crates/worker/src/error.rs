//! Error types of the dispatch core.
//!
//! [`DispatchError`] is returned to the direct caller of a [`Dispatcher`]
//! operation. [`JobExecutionError`] describes a single job's failure; it is
//! reported and logged by the worker and never propagates past the worker
//! loop.
//!
//! [`Dispatcher`]: crate::Dispatcher

use std::time::Duration;

use hookd_core::scripting::ScriptError;

/// Errors returned by [`Dispatcher`](crate::Dispatcher) operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// `start` was called on a dispatcher that is already running.
    #[error("dispatcher already started")]
    AlreadyStarted,

    /// `submit` was called before `start`.
    #[error("dispatcher has not been started")]
    NotStarted,

    /// `start` was called with a pool size of zero.
    #[error("worker pool size must be at least 1")]
    InvalidPoolSize,

    /// The dispatcher is draining or stopped and accepts no new jobs.
    #[error("dispatcher closed: no new jobs are accepted")]
    DispatcherClosed,

    /// The bounded job queue is at capacity. Callers should reject upstream.
    #[error("job queue is full ({capacity} jobs pending)")]
    QueueFull { capacity: usize },

    /// Workers did not drain before the shutdown deadline.
    #[error(
        "shutdown timed out after {timeout:?}: {in_flight} job(s) abandoned in flight, {pending} left queued"
    )]
    ShutdownTimedOut {
        timeout: Duration,
        in_flight: usize,
        pending: usize,
    },

    /// The operator forced termination before workers drained.
    #[error("shutdown forced: {in_flight} job(s) abandoned in flight, {pending} left queued")]
    ShutdownForced { in_flight: usize, pending: usize },
}

impl DispatchError {
    /// `true` for the shutdown outcomes that abandoned work.
    pub fn is_forced_termination(&self) -> bool {
        matches!(
            self,
            Self::ShutdownTimedOut { .. } | Self::ShutdownForced { .. }
        )
    }
}

/// Why a single job did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The hook script could not be run.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The hook script ran and exited non-zero.
    #[error("hook exited with code {exit_code}")]
    NonZeroExit { exit_code: i32, stderr: String },

    /// The job exceeded its per-job timeout and was aborted.
    #[error("job timed out after {after:?}")]
    TimedOut { after: Duration },

    /// The job's handler panicked. The worker survived.
    #[error("job handler panicked: {0}")]
    Panicked(String),

    /// Handler-defined failure.
    #[error("job failed: {0}")]
    Failed(String),

    /// The job was still running when a forced shutdown cancelled the pool.
    #[error("job abandoned by forced shutdown")]
    Abandoned,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_termination_is_distinguishable_from_clean_errors() {
        let timed_out = DispatchError::ShutdownTimedOut {
            timeout: Duration::from_secs(1),
            in_flight: 1,
            pending: 2,
        };
        let forced = DispatchError::ShutdownForced {
            in_flight: 0,
            pending: 0,
        };
        assert!(timed_out.is_forced_termination());
        assert!(forced.is_forced_termination());
        assert!(!DispatchError::DispatcherClosed.is_forced_termination());
    }

    #[test]
    fn display_shutdown_timed_out() {
        let err = DispatchError::ShutdownTimedOut {
            timeout: Duration::from_secs(1),
            in_flight: 1,
            pending: 2,
        };
        assert_eq!(
            err.to_string(),
            "shutdown timed out after 1s: 1 job(s) abandoned in flight, 2 left queued"
        );
    }

    #[test]
    fn script_errors_are_transparent() {
        let err = JobExecutionError::from(ScriptError::NotFound("hooks/x.sh".into()));
        assert_eq!(err.to_string(), "Script not found: hooks/x.sh");
    }
}
