//! OS signal forwarding.
//!
//! Signals are turned into [`TerminationSignal`] messages on a channel so the
//! shutdown coordinator can wait on them like any other event. Every signal
//! is forwarded, not only the first: a second one forces termination.

use tokio::sync::mpsc;

use crate::shutdown::TerminationSignal;

/// Install SIGINT and SIGTERM handlers and forward them into a channel.
///
/// Fails if the handlers cannot be registered. Must be called from within a
/// Tokio runtime.
pub fn listen() -> std::io::Result<mpsc::Receiver<TerminationSignal>> {
    let (tx, rx) = mpsc::channel(4);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = interrupt.recv() => TerminationSignal::Interrupt,
                    Some(()) = terminate.recv() => TerminationSignal::Terminate,
                    else => break,
                };
                if tx.send(received).await.is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(TerminationSignal::Interrupt).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}
