//! OS signal handling that drives the process-wide [`ShutdownSignal`].

use thiserror::Error;
use tracing::info;

use taskrelay_core::ShutdownSignal;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("failed to install signal handler: {0}")]
    Setup(String),
}

/// Installs SIGINT/SIGTERM handlers (Unix) or Ctrl+C (everywhere else)
/// and triggers `shutdown` the first time either fires.
pub async fn install(shutdown: ShutdownSignal) -> Result<(), SignalError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| SignalError::Setup(e.to_string()))?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| SignalError::Setup(e.to_string()))?;

        let shutdown_for_term = shutdown.clone();
        tokio::spawn(async move {
            if sigterm.recv().await.is_some() {
                info!("received SIGTERM, triggering shutdown");
                shutdown_for_term.trigger();
            }
        });

        tokio::spawn(async move {
            if sigint.recv().await.is_some() {
                info!("received SIGINT, triggering shutdown");
                shutdown.trigger();
            }
        });

        info!("OS signal handlers installed (SIGTERM, SIGINT)");
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl+C, triggering shutdown");
                shutdown.trigger();
            }
        });

        info!("OS signal handlers installed (Ctrl+C)");
    }

    Ok(())
}
