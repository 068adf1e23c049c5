// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use std::sync::Arc;

use tokio::sync::Notify;

use crate::logger;

/// Install shutdown signal handlers and return the notify they trip.
///
/// The accept loop waits on the returned `Notify`; in-flight connections
/// finish naturally after it fires.
#[cfg(unix)]
#[allow(clippy::ignored_unit_patterns)]
pub fn install_shutdown_handler() -> Arc<Notify> {
    use tokio::signal::unix::{signal, SignalKind};

    let shutdown = Arc::new(Notify::new());
    let notify = Arc::clone(&shutdown);

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                logger::log_error(&format!("Failed to register SIGTERM handler: {e}"));
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                logger::log_error(&format!("Failed to register SIGINT handler: {e}"));
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        notify.notify_waiters();
    });

    shutdown
}

/// Fallback for non-Unix platforms, only Ctrl+C is supported
#[cfg(not(unix))]
pub fn install_shutdown_handler() -> Arc<Notify> {
    let shutdown = Arc::new(Notify::new());
    let notify = Arc::clone(&shutdown);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => notify.notify_waiters(),
            Err(e) => logger::log_error(&format!("Failed to listen for Ctrl+C: {e}")),
        }
    });

    shutdown
}
