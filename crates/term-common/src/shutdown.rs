//! Termination signal handling
//!
//! SIGINT and SIGTERM are never handled by jumping into cleanup code. A
//! listener task turns the first signal into a cancelled
//! [`CancellationToken`]; the owner of the work polls the token at points
//! where stopping is safe (between records, after the server drained).
//!
//! Once tokio has registered a handler for a signal it stays registered for
//! the life of the process, so a second Ctrl+C during the final flush is
//! absorbed instead of killing the process.

use std::fmt;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Which termination request was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => f.write_str("SIGINT"),
            ShutdownReason::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Wait for the first SIGINT or SIGTERM.
pub async fn wait_for_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping at the next safe point");
            ShutdownReason::Interrupt
        },
        _ = terminate => {
            info!("Received terminate signal, stopping at the next safe point");
            ShutdownReason::Terminate
        },
    }
}

/// A one-shot shutdown request shared between a signal listener and the
/// task doing the work.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: std::sync::Arc<std::sync::OnceLock<ShutdownReason>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `reason` and cancel the token. Only the first call counts.
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            self.token.cancel();
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason recorded by the first [`Shutdown::trigger`], if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Resolves once a shutdown has been requested.
    pub async fn triggered(&self) -> ShutdownReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(ShutdownReason::Interrupt)
    }

    /// Spawn a task that triggers this shutdown on SIGINT/SIGTERM.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            let reason = wait_for_signal().await;
            shutdown.trigger(reason);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_trigger_wins() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert_eq!(shutdown.reason(), None);

        shutdown.trigger(ShutdownReason::Terminate);
        shutdown.trigger(ShutdownReason::Interrupt);

        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::Terminate));
        assert_eq!(shutdown.triggered().await, ShutdownReason::Terminate);
    }

    #[tokio::test]
    async fn test_clones_observe_trigger() {
        let shutdown = Shutdown::new();
        let observer = shutdown.clone();

        let waiter = tokio::spawn(async move { observer.triggered().await });
        shutdown.trigger(ShutdownReason::Interrupt);

        assert_eq!(waiter.await.unwrap(), ShutdownReason::Interrupt);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ShutdownReason::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownReason::Terminate.to_string(), "SIGTERM");
    }
}
