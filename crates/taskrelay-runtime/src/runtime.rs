//! The Task Runtime: the sole producer of `TaskInstanceId`s, owner of every
//! live instance, and the single-writer event loop that mediates between
//! request sources and task implementations.
//!
//! The loop shape mirrors a worker-pool run loop
//! (`tokio::select!` over a shutdown signal and a work source), generalized
//! from one queue to four: run requests, cancel requests, completion
//! signals, and shutdown.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use taskrelay_core::{LifecycleHook, ShutdownSignal};
use taskrelay_protocols::error::RuntimeError;
use taskrelay_protocols::{DispatchPort, RunRequest, RunRequestSource, TaskContext, TaskInstanceId};

use crate::factory::FactoryRegistry;
use crate::handler::{CancellationFlag, TaskRunContext};
use crate::stats::{RuntimeStats, RuntimeStatsSnapshot};

struct LiveInstance {
    cancel: CancellationFlag,
}

/// Owns the run/cancel/done event loop and the live-instance registry.
pub struct TaskRuntime {
    dispatch: Arc<dyn DispatchPort>,
    factories: FactoryRegistry,
    shutdown: ShutdownSignal,
    running: Arc<AtomicBool>,
    stats: Arc<RuntimeStats>,
    run_tx: mpsc::UnboundedSender<RunRequest>,
    run_rx: Mutex<Option<mpsc::UnboundedReceiver<RunRequest>>>,
    cancel_tx: mpsc::UnboundedSender<TaskInstanceId>,
    cancel_rx: Mutex<Option<mpsc::UnboundedReceiver<TaskInstanceId>>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskRuntime {
    pub fn new(dispatch: Arc<dyn DispatchPort>, shutdown: ShutdownSignal) -> Arc<Self> {
        let (run_tx, run_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            dispatch,
            factories: FactoryRegistry::new(),
            shutdown,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RuntimeStats::default()),
            run_tx,
            run_rx: Mutex::new(Some(run_rx)),
            cancel_tx,
            cancel_rx: Mutex::new(Some(cancel_rx)),
            loop_handle: Mutex::new(None),
        })
    }

    pub fn register_factory(&self, factory: Arc<dyn crate::handler::TaskHandlerFactory>) {
        self.factories.register(factory);
    }

    pub fn stats(&self) -> RuntimeStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Non-blocking; enqueues the request. Returns false only if the
    /// runtime is not running.
    pub async fn submit_run(&self, request: RunRequest) -> bool {
        if !self.is_running() {
            return false;
        }
        self.run_tx.send(request).is_ok()
    }

    /// Non-blocking advisory cancel.
    pub async fn submit_cancel(&self, instance_id: TaskInstanceId) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_tx.send(instance_id).is_ok()
    }

    async fn accept(
        self: &Arc<Self>,
        request: RunRequest,
        instances: &mut HashMap<TaskInstanceId, LiveInstance>,
        next_id: &mut TaskInstanceId,
        done_tx: &mpsc::UnboundedSender<TaskInstanceId>,
    ) {
        let Some(factory) = self.factories.lookup(&request.kind, &request.command_kind) else {
            warn!(kind = %request.kind, command_kind = %request.command_kind, "unknown task kind, discarding request");
            let dispatch = self.dispatch.clone();
            let notifier_id = request.notifier_id.clone();
            let context = request.context.clone();
            let text = format!(
                "could not start {}:{} - unknown task kind",
                request.kind, request.command_kind
            );
            tokio::spawn(async move {
                dispatch.notify_with_context(&notifier_id, &text, &context).await;
            });
            return;
        };

        let instance_id = Self::next_instance_id(instances, next_id);
        let cancel = CancellationFlag::new();
        instances.insert(instance_id, LiveInstance { cancel: cancel.clone() });
        self.stats.record_accepted();

        if request.notify_on_start {
            let dispatch = self.dispatch.clone();
            let notifier_id = request.notifier_id.clone();
            let context = request.context.clone();
            let text = format!(
                "accepted; your request is queued, cancel token = /cancel_{instance_id}"
            );
            tokio::spawn(async move {
                dispatch.notify_with_context(&notifier_id, &text, &context).await;
            });
        }

        let run_context = TaskRunContext {
            instance_id,
            kind: request.kind.clone(),
            command_kind: request.command_kind.clone(),
            notifier_id: request.notifier_id.clone(),
            context: request.context.clone(),
        };
        let task_handler = factory.create(run_context);
        let dispatch = self.dispatch.clone();
        let stats = self.stats.clone();
        let notifier_id = request.notifier_id.clone();
        let context = request.context.clone();
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(task_handler.run(cancel)).catch_unwind().await;

            let text = match outcome {
                Ok(Ok(message)) => {
                    stats.record_completed();
                    message
                }
                Ok(Err(e)) => {
                    stats.record_failed();
                    format!("task failed: {e}")
                }
                Err(panic) => {
                    stats.record_failed();
                    let reason = panic_message(panic);
                    error!(instance_id, "task handler panicked: {}", reason);
                    format!("task failed: handler panicked: {reason}")
                }
            };

            dispatch.notify_with_context(&notifier_id, &text, &context).await;
            let _ = done_tx.send(instance_id);
        });
    }

    fn next_instance_id(
        instances: &HashMap<TaskInstanceId, LiveInstance>,
        next_id: &mut TaskInstanceId,
    ) -> TaskInstanceId {
        loop {
            let candidate = *next_id;
            *next_id = next_id.wrapping_add(1).max(1);
            if !instances.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    async fn run_loop(
        self: Arc<Self>,
        mut run_rx: mpsc::UnboundedReceiver<RunRequest>,
        mut cancel_rx: mpsc::UnboundedReceiver<TaskInstanceId>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<TaskInstanceId>();
        let mut instances: HashMap<TaskInstanceId, LiveInstance> = HashMap::new();
        let mut next_id: TaskInstanceId = 1;
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("task runtime shutting down, cancelling {} live instance(s)", instances.len());
                    for instance in instances.values() {
                        instance.cancel.cancel();
                    }
                    run_rx.close();
                    cancel_rx.close();
                    while !instances.is_empty() {
                        match done_rx.recv().await {
                            Some(id) => { instances.remove(&id); }
                            None => break,
                        }
                    }
                    break;
                }
                Some(request) = run_rx.recv() => {
                    self.accept(request, &mut instances, &mut next_id, &done_tx).await;
                }
                Some(instance_id) = cancel_rx.recv() => {
                    match instances.get(&instance_id) {
                        Some(instance) => {
                            instance.cancel.cancel();
                            self.stats.record_cancelled();
                        }
                        None => warn!(instance_id, "cancel request for unknown instance id"),
                    }
                }
                Some(instance_id) = done_rx.recv() => {
                    if instances.remove(&instance_id).is_none() {
                        warn!(instance_id, "completion signal for unregistered instance id");
                    }
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[async_trait]
impl RunRequestSource for TaskRuntime {
    async fn submit_run(&self, request: RunRequest) -> bool {
        TaskRuntime::submit_run(self, request).await
    }

    async fn submit_cancel(&self, instance_id: TaskInstanceId) -> bool {
        TaskRuntime::submit_cancel(self, instance_id).await
    }
}

/// Bridges [`TaskRuntime`] into the generic [`LifecycleManager`](taskrelay_core::LifecycleManager).
///
/// `TaskRuntime::start` needs `Arc<Self>` (the loop and every instance task
/// it spawns must be able to outlive the call), which `LifecycleHook::on_start`'s
/// `&self` cannot provide directly - this wrapper holds the `Arc` instead.
pub struct RuntimeLifecycleHook(pub Arc<TaskRuntime>);

#[async_trait]
impl LifecycleHook for RuntimeLifecycleHook {
    async fn on_start(&self) -> Result<(), RuntimeError> {
        self.0.start().await
    }

    async fn on_stop(&self) -> Result<(), RuntimeError> {
        self.0.stop().await
    }

    fn priority(&self) -> i32 {
        taskrelay_core::priority::RUNTIME
    }
}

impl TaskRuntime {
    /// Starts the event loop. Idempotent; a second call logs a warning and
    /// returns success without touching the already-running loop
    /// round-trip property). Takes `self: &Arc<Self>` because the spawned
    /// loop (and every instance task it spawns) must outlive this call.
    pub async fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        let mut handle_slot = self.loop_handle.lock().await;
        if handle_slot.is_some() {
            warn!("task runtime already started, ignoring second start()");
            return Ok(());
        }

        let run_rx = self
            .run_rx
            .lock()
            .await
            .take()
            .expect("run_rx taken exactly once across the runtime's lifetime");
        let cancel_rx = self
            .cancel_rx
            .lock()
            .await
            .take()
            .expect("cancel_rx taken exactly once across the runtime's lifetime");

        self.running.store(true, Ordering::SeqCst);
        let runtime = self.clone();
        *handle_slot = Some(tokio::spawn(runtime.run_loop(run_rx, cancel_rx)));
        info!("task runtime started");
        Ok(())
    }

    /// Idempotent; waits for the event loop (and, transitively, every live
    /// instance) to finish before returning.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.trigger();
        let mut handle_slot = self.loop_handle.lock().await;
        if let Some(handle) = handle_slot.take() {
            handle.await.map_err(|e| RuntimeError::Panicked(e.to_string()))?;
        }
        info!("task runtime stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as at;
    use std::time::Duration;
    use taskrelay_protocols::{NotifierId, Origin};
    use tokio::sync::Mutex as TokioMutex;

    struct RecordingDispatch {
        messages: Arc<TokioMutex<Vec<(String, String)>>>,
    }

    #[at]
    impl DispatchPort for RecordingDispatch {
        async fn notify_with_context(&self, notifier_id: &NotifierId, text: &str, _context: &TaskContext) -> bool {
            self.messages.lock().await.push((notifier_id.clone(), text.to_string()));
            true
        }
    }

    fn new_runtime() -> (Arc<TaskRuntime>, Arc<TokioMutex<Vec<(String, String)>>>) {
        let messages = Arc::new(TokioMutex::new(Vec::new()));
        let dispatch = Arc::new(RecordingDispatch { messages: messages.clone() });
        let runtime = TaskRuntime::new(dispatch, ShutdownSignal::new());
        runtime.register_factory(Arc::new(crate::fixtures::EchoTaskHandlerFactory));
        (runtime, messages)
    }

    #[tokio::test]
    async fn accepted_run_produces_one_instance_and_one_completion() {
        let (runtime, messages) = new_runtime();
        runtime.start().await.unwrap();

        let req = RunRequest::new("ECHO", "Say", "tg1", Origin::Api);
        assert!(runtime.submit_run(req).await);

        for _ in 0..50 {
            if runtime.stats().completed == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(runtime.stats().accepted, 1);
        assert_eq!(runtime.stats().completed, 1);
        assert_eq!(messages.lock().await.len(), 1);

        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_kind_reports_error_and_registers_nothing() {
        let (runtime, messages) = new_runtime();
        runtime.start().await.unwrap();

        let req = RunRequest::new("DOES_NOT_EXIST", "Whatever", "tg1", Origin::Api);
        assert!(runtime.submit_run(req).await);

        for _ in 0..50 {
            if !messages.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(runtime.stats().accepted, 0);
        let msgs = messages.lock().await;
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].1.contains("unknown task kind"));

        drop(msgs);
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_on_unknown_instance_is_a_harmless_noop() {
        let (runtime, _messages) = new_runtime();
        runtime.start().await.unwrap();

        assert!(runtime.submit_cancel(9999).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runtime.stats().cancelled, 0);

        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn submit_before_start_returns_false() {
        let (runtime, _messages) = new_runtime();
        assert!(!runtime.submit_run(RunRequest::new("ECHO", "Say", "tg1", Origin::Api)).await);
    }

    #[tokio::test]
    async fn second_start_is_a_noop_warning() {
        let (runtime, _messages) = new_runtime();
        runtime.start().await.unwrap();
        runtime.start().await.unwrap();
        assert!(runtime.is_running());
        runtime.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_waits_for_zero_live_instances() {
        let (runtime, _messages) = new_runtime();
        runtime.start().await.unwrap();

        for _ in 0..5 {
            runtime
                .submit_run(RunRequest::new("ECHO", "Say", "tg1", Origin::Api))
                .await;
        }

        runtime.stop().await.unwrap();
        assert!(!runtime.is_running());
    }
}
