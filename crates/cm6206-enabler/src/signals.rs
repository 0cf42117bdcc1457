//! Termination and hangup signals.

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::debug;

/// A signal the main loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGINT or SIGTERM
    Interrupt,
    /// SIGHUP
    Hangup,
}

/// Set up signal handlers.
///
/// Returns a receiver fed with every SIGINT, SIGTERM and SIGHUP received.
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<SignalEvent>> {
    let (tx, rx) = mpsc::channel(4);

    let handlers = [
        (SignalKind::interrupt(), SignalEvent::Interrupt, "SIGINT"),
        (SignalKind::terminate(), SignalEvent::Interrupt, "SIGTERM"),
        (SignalKind::hangup(), SignalEvent::Hangup, "SIGHUP"),
    ];

    for (kind, event, name) in handlers {
        let mut stream =
            signal(kind).with_context(|| format!("Could not establish new {name} handler"))?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!(signal = name, "Received signal");
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(rx)
}
