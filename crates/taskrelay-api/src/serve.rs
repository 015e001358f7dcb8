//! Bridges the axum HTTP entry point into the generic `LifecycleManager`,
//! via `axum::serve(...).with_graceful_shutdown(...)`. Shutdown is
//! bounded at 5s.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use taskrelay_core::{priority, LifecycleHook, ShutdownSignal};
use taskrelay_protocols::error::RuntimeError;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the bound listener and the spawned `axum::serve` task.
pub struct ApiLifecycleHook {
    addr: SocketAddr,
    router: Router,
    shutdown: ShutdownSignal,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ApiLifecycleHook {
    pub fn new(addr: SocketAddr, router: Router, shutdown: ShutdownSignal) -> Self {
        Self {
            addr,
            router,
            shutdown,
            handle: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LifecycleHook for ApiLifecycleHook {
    async fn on_start(&self) -> Result<(), RuntimeError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| RuntimeError::BindFailed(format!("{}: {e}", self.addr)))?;
        info!("HTTP entry point listening on {}", self.addr);

        let router = self.router.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let graceful = async move {
                let _ = shutdown_rx.recv().await;
            };
            if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(graceful).await {
                warn!("HTTP server exited with error: {}", e);
            }
        });

        *self.handle.lock().await = Some(handle);
        Ok(())
    }

    async fn on_stop(&self) -> Result<(), RuntimeError> {
        if let Some(handle) = self.handle.lock().await.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                warn!("HTTP entry point did not shut down within {:?}", SHUTDOWN_TIMEOUT);
            }
        }
        Ok(())
    }

    fn priority(&self) -> i32 {
        priority::API
    }
}
