//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGTERM and SIGINT (Ctrl-C on every platform)
//! - Report the first one received to the owner of the server
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The listener task is aborted when its receiver is dropped

use std::fmt;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A termination request from the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("interrupt"),
            Signal::Terminate => f.write_str("terminate"),
        }
    }
}

/// Receiving end of the signal listener.
#[derive(Debug)]
pub struct SignalReceiver {
    rx: oneshot::Receiver<Signal>,
    done: bool,
    listener: JoinHandle<()>,
}

impl SignalReceiver {
    /// Wait for the first signal.
    ///
    /// Returns `None` once a signal has already been delivered, or if the
    /// listener could not be installed.
    pub async fn recv(&mut self) -> Option<Signal> {
        if self.done {
            return None;
        }
        let signal = (&mut self.rx).await.ok();
        self.done = true;
        signal
    }
}

impl Drop for SignalReceiver {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Start listening for termination signals on a background task.
pub fn listen() -> SignalReceiver {
    let (tx, rx) = oneshot::channel();
    let listener = tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(%signal, "Received signal, initiating graceful shutdown");
        let _ = tx.send(signal);
    });

    SignalReceiver {
        rx,
        done: false,
        listener,
    }
}

async fn wait_for_signal() -> Signal {
    tokio::select! {
        signal = interrupt() => signal,
        signal = terminate() => signal,
    }
}

async fn interrupt() -> Signal {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to register Ctrl-C handler");
        return std::future::pending().await;
    }
    Signal::Interrupt
}

#[cfg(unix)]
async fn terminate() -> Signal {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            if sigterm.recv().await.is_some() {
                return Signal::Terminate;
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to register SIGTERM handler"),
    }
    std::future::pending().await
}

#[cfg(not(unix))]
async fn terminate() -> Signal {
    std::future::pending().await
}
