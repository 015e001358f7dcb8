//! Service lifecycle glue: a process-wide shutdown signal plus priority
//! ordered start/stop sequencing for the four long-lived components.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::time::timeout;
use tracing::{error, info, warn};

use taskrelay_protocols::error::RuntimeError;

/// Component priority. Higher starts earlier AND stops earlier, matching
/// the shutdown order Scheduler -> Runtime -> Dispatcher -> HTTP.
/// This is not a simple LIFO convention (where higher priority
/// starts earlier but stops later): here priority order is applied
/// directly to both the start and the stop sequence, since startup calls
/// for stopping new arrivals (Scheduler) before draining in-flight work
/// (Runtime) before stopping the output side (Dispatcher, then HTTP).
pub mod priority {
    pub const SCHEDULER: i32 = 300;
    pub const RUNTIME: i32 = 200;
    pub const DISPATCHER: i32 = 100;
    pub const API: i32 = 0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    Created = 0,
    Starting = 1,
    Running = 2,
    ShuttingDown = 3,
    Stopped = 4,
}

impl From<u8> for ServiceState {
    fn from(v: u8) -> Self {
        match v {
            0 => ServiceState::Created,
            1 => ServiceState::Starting,
            2 => ServiceState::Running,
            3 => ServiceState::ShuttingDown,
            4 => ServiceState::Stopped,
            _ => ServiceState::Created,
        }
    }
}

/// Process-wide cancellation signal, derived from the OS interrupt/
/// termination signals and fanned out to every component.
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    pub fn trigger(&self) {
        let _ = self.sender.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Common `start`/`stop` shape implemented by the Task Runtime, the
/// Dispatcher, and the HTTP entry point.
#[async_trait::async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn on_start(&self) -> Result<(), RuntimeError>;
    async fn on_stop(&self) -> Result<(), RuntimeError>;

    /// Higher priority starts earlier, stops later.
    fn priority(&self) -> i32 {
        0
    }
}

/// Sequences start/stop of all registered hooks by priority and owns the
/// shared [`ShutdownSignal`].
pub struct LifecycleManager {
    state: AtomicU8,
    hooks: RwLock<Vec<Arc<dyn LifecycleHook>>>,
    shutdown_signal: ShutdownSignal,
    shutdown_timeout: Duration,
}

impl LifecycleManager {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            state: AtomicU8::new(ServiceState::Created as u8),
            hooks: RwLock::new(Vec::new()),
            shutdown_signal: ShutdownSignal::new(),
            shutdown_timeout,
        }
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ServiceState::Running as u8
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown_signal
    }

    pub async fn register_hook(&self, hook: Arc<dyn LifecycleHook>) {
        let mut hooks = self.hooks.write().await;
        hooks.push(hook);
        hooks.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Idempotent: a second call logs a warning and returns success without
    /// touching already-running hooks.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        let current = self.state.load(Ordering::SeqCst);
        if current != ServiceState::Created as u8 {
            warn!("lifecycle manager already started, ignoring second start()");
            return Ok(());
        }

        self.state.store(ServiceState::Starting as u8, Ordering::SeqCst);
        info!("starting service lifecycle");

        let hooks = self.hooks.read().await;
        for (i, hook) in hooks.iter().enumerate() {
            if let Err(e) = hook.on_start().await {
                error!("hook {} failed to start: {}", i, e);
                for started in hooks.iter().take(i).rev() {
                    let _ = started.on_stop().await;
                }
                self.state.store(ServiceState::Stopped as u8, Ordering::SeqCst);
                return Err(e);
            }
        }

        self.state.store(ServiceState::Running as u8, Ordering::SeqCst);
        info!("service lifecycle running");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), RuntimeError> {
        let current = self.state.load(Ordering::SeqCst);
        if current != ServiceState::Running as u8 {
            return Ok(());
        }

        self.state.store(ServiceState::ShuttingDown as u8, Ordering::SeqCst);
        info!("shutting down service lifecycle");
        self.shutdown_signal.trigger();

        let hooks = self.hooks.read().await;
        let mut failures = 0usize;
        for hook in hooks.iter() {
            match timeout(self.shutdown_timeout, hook.on_stop()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("hook stop error: {}", e);
                    failures += 1;
                }
                Err(_) => {
                    warn!("hook stop timed out");
                    failures += 1;
                }
            }
        }

        self.state.store(ServiceState::Stopped as u8, Ordering::SeqCst);
        info!("service lifecycle stopped");

        if failures == 0 {
            Ok(())
        } else {
            Err(RuntimeError::ShutdownTimeout(failures))
        }
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct TestHook {
        started: AtomicBool,
        stopped: AtomicBool,
        priority: i32,
    }

    impl TestHook {
        fn new(priority: i32) -> Self {
            Self {
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                priority,
            }
        }
    }

    #[async_trait::async_trait]
    impl LifecycleHook for TestHook {
        async fn on_start(&self) -> Result<(), RuntimeError> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn on_stop(&self) -> Result<(), RuntimeError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    #[tokio::test]
    async fn start_stop_runs_every_hook() {
        let manager = LifecycleManager::default();
        let hook = Arc::new(TestHook::new(0));
        manager.register_hook(hook.clone()).await;

        manager.start().await.unwrap();
        assert!(hook.started.load(Ordering::SeqCst));
        assert!(manager.is_running());

        manager.stop().await.unwrap();
        assert!(hook.stopped.load(Ordering::SeqCst));
        assert_eq!(manager.state(), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn second_start_is_a_noop_warning_not_an_error() {
        let manager = LifecycleManager::default();
        manager.start().await.unwrap();
        let result = manager.start().await;
        assert!(result.is_ok());
        assert_eq!(manager.state(), ServiceState::Running);
    }

    #[tokio::test]
    async fn hooks_start_in_priority_order_scheduler_first() {
        let manager = LifecycleManager::default();
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        struct OrderedHook {
            name: &'static str,
            priority: i32,
            order: Arc<tokio::sync::Mutex<Vec<&'static str>>>,
        }

        #[async_trait::async_trait]
        impl LifecycleHook for OrderedHook {
            async fn on_start(&self) -> Result<(), RuntimeError> {
                self.order.lock().await.push(self.name);
                Ok(())
            }
            async fn on_stop(&self) -> Result<(), RuntimeError> {
                Ok(())
            }
            fn priority(&self) -> i32 {
                self.priority
            }
        }

        manager
            .register_hook(Arc::new(OrderedHook {
                name: "api",
                priority: priority::API,
                order: order.clone(),
            }))
            .await;
        manager
            .register_hook(Arc::new(OrderedHook {
                name: "scheduler",
                priority: priority::SCHEDULER,
                order: order.clone(),
            }))
            .await;
        manager
            .register_hook(Arc::new(OrderedHook {
                name: "runtime",
                priority: priority::RUNTIME,
                order: order.clone(),
            }))
            .await;

        manager.start().await.unwrap();
        let observed = order.lock().await.clone();
        assert_eq!(observed, vec!["scheduler", "runtime", "api"]);
    }

    #[tokio::test]
    async fn hooks_stop_in_priority_order_scheduler_first() {
        let manager = LifecycleManager::default();
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        struct OrderedHook {
            name: &'static str,
            priority: i32,
            order: Arc<tokio::sync::Mutex<Vec<&'static str>>>,
        }

        #[async_trait::async_trait]
        impl LifecycleHook for OrderedHook {
            async fn on_start(&self) -> Result<(), RuntimeError> {
                Ok(())
            }
            async fn on_stop(&self) -> Result<(), RuntimeError> {
                self.order.lock().await.push(self.name);
                Ok(())
            }
            fn priority(&self) -> i32 {
                self.priority
            }
        }

        manager
            .register_hook(Arc::new(OrderedHook {
                name: "dispatcher",
                priority: priority::DISPATCHER,
                order: order.clone(),
            }))
            .await;
        manager
            .register_hook(Arc::new(OrderedHook {
                name: "scheduler",
                priority: priority::SCHEDULER,
                order: order.clone(),
            }))
            .await;
        manager
            .register_hook(Arc::new(OrderedHook {
                name: "runtime",
                priority: priority::RUNTIME,
                order: order.clone(),
            }))
            .await;

        manager.start().await.unwrap();
        manager.stop().await.unwrap();
        let observed = order.lock().await.clone();
        assert_eq!(observed, vec!["scheduler", "runtime", "dispatcher"]);
    }
}
