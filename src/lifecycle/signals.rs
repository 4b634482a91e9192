//! OS signal handling.
//!
//! SIGINT and SIGTERM end the signal-wait action, which in turn triggers
//! the orchestrated shutdown. The wait also ends when the shared shutdown
//! fires for any other reason.

use crate::lifecycle::{BoxError, ShutdownListener};

/// Block until a termination signal arrives or `shutdown` fires.
///
/// Both outcomes are a clean stop.
pub async fn wait_for_signal(mut shutdown: ShutdownListener) -> Result<(), BoxError> {
    tokio::select! {
        result = termination() => {
            result?;
            tracing::info!("Shutdown signal received");
        }
        _ = shutdown.recv() => {
            tracing::debug!("Signal wait cancelled");
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn termination() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
