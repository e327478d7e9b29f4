//! Graceful shutdown sequencing.
//!
//! On the first termination signal the [`ShutdownCoordinator`]:
//!
//! 1. tells the HTTP listener to stop accepting connections and waits for it
//!    to finish in-flight requests (which may still submit jobs),
//! 2. drains the dispatcher with whatever remains of the overall deadline.
//!
//! A second signal during the drain abandons in-flight jobs. Signals that
//! arrive while the listener is still stopping are absorbed. A listener that
//! exits before any signal is fatal.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hookd_worker::{DispatchError, Dispatcher, ShutdownReport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An operator request to terminate the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl std::fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        })
    }
}

/// Time budget for a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownDeadlines {
    /// Upper bound for the whole sequence.
    pub overall: Duration,
    /// Upper bound for the HTTP listener to stop (capped by `overall`).
    pub listener: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("HTTP listener did not stop within {after:?}")]
    ListenerTimedOut { after: Duration },

    #[error("HTTP listener failed: {0}")]
    Listener(String),

    #[error(transparent)]
    Dispatcher(#[from] DispatchError),
}

pub struct ShutdownCoordinator {
    dispatcher: Arc<Dispatcher>,
    deadlines: ShutdownDeadlines,
    stop_accepting: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(dispatcher: Arc<Dispatcher>, deadlines: ShutdownDeadlines) -> Self {
        Self {
            dispatcher,
            deadlines,
            stop_accepting: CancellationToken::new(),
        }
    }

    /// Future for `axum::serve(..).with_graceful_shutdown(..)`. Resolves once
    /// the listener must stop accepting connections.
    pub fn listener_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        self.stop_accepting.clone().cancelled_owned()
    }

    /// Wait for a termination signal, then shut down the listener and the
    /// dispatcher in that order.
    ///
    /// `listener` is the task running the HTTP server. A listener that exits
    /// on its own, fails, or misses its deadline is fatal; the dispatcher is
    /// not drained.
    pub async fn coordinate<E>(
        self,
        mut signals: mpsc::Receiver<TerminationSignal>,
        mut listener: JoinHandle<Result<(), E>>,
    ) -> Result<ShutdownReport, ShutdownError>
    where
        E: std::fmt::Display,
    {
        tokio::select! {
            biased;
            signal = signals.recv() => match signal {
                Some(signal) => tracing::info!(%signal, "Received termination signal, starting graceful shutdown"),
                None => tracing::warn!("Signal channel closed, starting graceful shutdown"),
            },
            joined = &mut listener => {
                self.stop_accepting.cancel();
                let reason = match joined {
                    Ok(Ok(())) => "exited before any termination signal".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(join_err) => join_err.to_string(),
                };
                tracing::error!(%reason, "HTTP listener stopped unexpectedly");
                return Err(ShutdownError::Listener(reason));
            }
        }

        let started = Instant::now();
        self.stop_accepting.cancel();

        let listener_deadline = self.deadlines.listener.min(self.deadlines.overall);
        match tokio::time::timeout(listener_deadline, listener).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "HTTP listener stopped",
                );
            }
            Ok(Ok(Err(e))) => return Err(ShutdownError::Listener(e.to_string())),
            Ok(Err(join_err)) => return Err(ShutdownError::Listener(join_err.to_string())),
            Err(_elapsed) => {
                return Err(ShutdownError::ListenerTimedOut {
                    after: listener_deadline,
                })
            }
        }

        // Only a signal sent once the drain has begun forces it.
        while let Ok(signal) = signals.try_recv() {
            tracing::info!(%signal, "Termination signal received while the listener was stopping");
        }

        let remaining = self.deadlines.overall.saturating_sub(started.elapsed());
        let force = async move {
            if let Some(signal) = signals.recv().await {
                tracing::warn!(%signal, "Second termination signal, abandoning in-flight jobs");
            } else {
                std::future::pending::<()>().await;
            }
        };

        let report = self
            .dispatcher
            .shutdown_with_abort(remaining, force)
            .await?;

        tracing::info!(
            completed = report.completed,
            failed = report.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Graceful shutdown complete",
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
