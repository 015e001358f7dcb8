//! The Notification Dispatcher: owns every [`NotifierHandler`], routes
//! `notify(notifierId, ...)` to the right one, and runs each handler's
//! long-lived `run` loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use taskrelay_core::{priority, LifecycleHook, ShutdownSignal};
use taskrelay_protocols::error::{DispatchError, RuntimeError};
use taskrelay_protocols::{DispatchPort, NotifierHandler, NotifierId, RunRequestSource, TaskContext};

/// Indirection point so concrete notifier transports can be built and
/// injected without the dispatcher knowing their concrete types - the
/// production factory builds `TelegramNotifier`/`LogNotifier` from config,
/// a test factory can hand back fakes instead.
pub trait HandlerFactory: Send + Sync {
    fn build(&self) -> Vec<Arc<dyn NotifierHandler>>;
}

/// Owns the notifier registry, built once at start and immutable at
/// steady state.
pub struct Dispatcher {
    handlers: DashMap<NotifierId, Arc<dyn NotifierHandler>>,
    default_id: NotifierId,
    running: AtomicBool,
    shutdown: ShutdownSignal,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    handler_factory: Mutex<Option<Arc<dyn HandlerFactory>>>,
}

impl Dispatcher {
    pub fn new(default_id: impl Into<NotifierId>, shutdown: ShutdownSignal) -> Self {
        Self {
            handlers: DashMap::new(),
            default_id: default_id.into(),
            running: AtomicBool::new(false),
            shutdown,
            task_handles: Mutex::new(Vec::new()),
            handler_factory: Mutex::new(None),
        }
    }

    /// Registers a handler directly. Intended to be called before
    /// `start()`; the set is treated as immutable once the dispatcher is
    /// running.
    pub fn register(&self, handler: Arc<dyn NotifierHandler>) {
        self.handlers.insert(handler.id().clone(), handler);
    }

    /// Sets the indirection point `start()` uses to build handlers from
    /// config. Must be called before `start()`; a factory set afterward has
    /// no effect on the already-running handler set.
    pub async fn set_handler_factory(&self, factory: Arc<dyn HandlerFactory>) {
        *self.handler_factory.lock().await = Some(factory);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn notifier_ids(&self) -> Vec<NotifierId> {
        self.handlers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Resolves a notifier ID, falling back to the default on an unknown
    /// ID and logging a warning.
    fn resolve(&self, notifier_id: &str) -> Option<Arc<dyn NotifierHandler>> {
        if let Some(handler) = self.handlers.get(notifier_id) {
            return Some(handler.clone());
        }

        if !notifier_id.is_empty() {
            error!(notifier_id, "unknown notifier id, falling back to default");
        }

        match self.handlers.get(self.default_id.as_str()) {
            Some(handler) => Some(handler.clone()),
            None => None,
        }
    }

    pub async fn notify_with_context(&self, notifier_id: &str, text: &str, context: &TaskContext) -> bool {
        match self.resolve(notifier_id) {
            Some(handler) => handler.notify(text, context).await,
            None => {
                warn!(notifier_id, "dispatch failed: no handler and no default notifier available");
                false
            }
        }
    }

    pub async fn notify(&self, notifier_id: &str, title: &str, text: &str, is_error: bool) -> bool {
        let body = if title.is_empty() {
            text.to_string()
        } else {
            format!("{title}\n{text}")
        };
        let body = if is_error { format!("[ERROR] {body}") } else { body };
        self.notify_with_context(notifier_id, &body, &TaskContext::new()).await
    }

    /// Shortcut for operational messages not tied to a task.
    pub async fn notify_default(&self, text: &str) -> bool {
        self.notify_with_context(&self.default_id, text, &TaskContext::new()).await
    }

    pub async fn notify_default_as_error(&self, text: &str) -> bool {
        self.notify_default(&format!("[ERROR] {text}")).await
    }

    pub fn supports_rich_text(&self, notifier_id: &str) -> bool {
        self.resolve(notifier_id).map(|h| h.supports_rich_text()).unwrap_or(false)
    }

    /// Builds all handlers from config via the factory; for each,
    /// launches its `run` loop, passing the task runner so the handler
    /// can submit `RunRequest`s back (the interactive feedback edge,
    /// request/reply loop).
    pub async fn start(&self, task_runner: Arc<dyn RunRequestSource>) -> Result<(), DispatchError> {
        if let Some(factory) = self.handler_factory.lock().await.as_ref() {
            for handler in factory.build() {
                self.register(handler);
            }
        }

        if self.handlers.is_empty() {
            return Err(DispatchError::NoHandlers);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("dispatcher already started, ignoring second start()");
            return Ok(());
        }

        let mut handles = self.task_handles.lock().await;
        for entry in self.handlers.iter() {
            let handler = entry.value().clone();
            let stop_rx = self.shutdown.subscribe();
            let task_runner = task_runner.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = handler.run(stop_rx, task_runner).await {
                    error!(notifier_id = %handler.id(), "notifier run loop exited with error: {}", e);
                }
            }));
        }

        info!("dispatcher started with {} notifier(s)", self.handlers.len());
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), DispatchError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.shutdown.trigger();
        let mut handles = self.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("dispatcher stopped");
        Ok(())
    }
}

#[async_trait]
impl DispatchPort for Dispatcher {
    async fn notify_with_context(&self, notifier_id: &NotifierId, text: &str, context: &TaskContext) -> bool {
        Dispatcher::notify_with_context(self, notifier_id, text, context).await
    }
}

/// Bridges [`Dispatcher`] into the generic [`LifecycleManager`](taskrelay_core::LifecycleManager).
pub struct DispatcherLifecycleHook {
    pub dispatcher: Arc<Dispatcher>,
    pub task_runner: Arc<dyn RunRequestSource>,
}

#[async_trait]
impl LifecycleHook for DispatcherLifecycleHook {
    async fn on_start(&self) -> Result<(), RuntimeError> {
        self.dispatcher
            .start(self.task_runner.clone())
            .await
            .map_err(|e| RuntimeError::Panicked(e.to_string()))
    }

    async fn on_stop(&self) -> Result<(), RuntimeError> {
        self.dispatcher.stop().await.map_err(|e| RuntimeError::Panicked(e.to_string()))
    }

    fn priority(&self) -> i32 {
        priority::DISPATCHER
    }
}
