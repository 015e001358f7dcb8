//! The Scheduler: on each firing of a time expression, submits one
//! `RunRequest` to the task runtime with `origin = Scheduler` and the
//! configured notifier ID. Nothing else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use taskrelay_core::{priority, LifecycleHook, ShutdownSignal};
use taskrelay_protocols::error::{RuntimeError, SchedulerError};
use taskrelay_protocols::{DispatchPort, NotifierId, Origin, RunRequest, RunRequestSource, TaskCommandKind, TaskContext, TaskKind};

use crate::timespec::TimeSpec;

/// One `{kind, commandKind, timeSpec, notifierID}` entry from config.
#[derive(Clone)]
pub struct ScheduleEntry {
    pub id: String,
    pub kind: TaskKind,
    pub command_kind: TaskCommandKind,
    pub notifier_id: NotifierId,
    time_spec: TimeSpec,
}

impl ScheduleEntry {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<TaskKind>,
        command_kind: impl Into<TaskCommandKind>,
        notifier_id: impl Into<NotifierId>,
        time_spec: &str,
    ) -> Result<Self, SchedulerError> {
        Ok(Self {
            id: id.into(),
            kind: kind.into(),
            command_kind: command_kind.into(),
            notifier_id: notifier_id.into(),
            time_spec: TimeSpec::parse(time_spec)?,
        })
    }
}

/// Notifier id reserved to mean "whatever the dispatcher's default is" -
/// any id the dispatcher registry doesn't recognize falls back to the
/// default notifier and logs a warning, so the scheduler
/// never needs to know the default id itself.
const FALLBACK_TO_DEFAULT: &str = "";

pub struct Scheduler {
    entries: Vec<ScheduleEntry>,
    running: AtomicBool,
    shutdown: ShutdownSignal,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Parses every entry up front; a malformed `time_spec` is fatal at
    /// construction and no entry is accepted if any one fails to parse.
    pub fn new(entries: Vec<ScheduleEntry>, shutdown: ShutdownSignal) -> Self {
        Self {
            entries,
            running: AtomicBool::new(false),
            shutdown,
            task_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn start(
        &self,
        runtime: Arc<dyn RunRequestSource>,
        dispatch: Arc<dyn DispatchPort>,
    ) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("scheduler already started, ignoring second start()");
            return Ok(());
        }

        let mut handles = self.task_handles.lock().await;
        for entry in &self.entries {
            let entry = entry.clone();
            let runtime = runtime.clone();
            let dispatch = dispatch.clone();
            let mut shutdown_rx = self.shutdown.subscribe();

            handles.push(tokio::spawn(async move {
                loop {
                    let sleep = match &entry.time_spec {
                        TimeSpec::Cron(_) => match entry.time_spec.next_after(Utc::now()) {
                            Some(next) => {
                                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                                tokio::time::sleep(wait)
                            }
                            None => break,
                        },
                        TimeSpec::Every(duration) => tokio::time::sleep(*duration),
                    };

                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep => {}
                    }

                    let request = RunRequest::new(
                        entry.kind.clone(),
                        entry.command_kind.clone(),
                        entry.notifier_id.clone(),
                        Origin::Scheduler,
                    );

                    if !runtime.submit_run(request).await {
                        warn!(schedule_id = %entry.id, "scheduler tick dropped: task runtime is not running");
                        dispatch
                            .notify_with_context(
                                &FALLBACK_TO_DEFAULT.to_string(),
                                &format!("scheduled task '{}' could not be submitted: runtime not running", entry.id),
                                &TaskContext::new(),
                            )
                            .await;
                    }
                }
            }));
        }

        info!("scheduler started with {} schedule(s)", self.entries.len());
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.shutdown.trigger();
        let mut handles = self.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("scheduler stopped");
        Ok(())
    }
}

/// Bridges [`Scheduler`] into the generic [`LifecycleManager`](taskrelay_core::LifecycleManager).
pub struct SchedulerLifecycleHook {
    pub scheduler: Arc<Scheduler>,
    pub runtime: Arc<dyn RunRequestSource>,
    pub dispatch: Arc<dyn DispatchPort>,
}

#[async_trait]
impl LifecycleHook for SchedulerLifecycleHook {
    async fn on_start(&self) -> Result<(), RuntimeError> {
        self.scheduler
            .start(self.runtime.clone(), self.dispatch.clone())
            .await
            .map_err(|e| RuntimeError::Panicked(e.to_string()))
    }

    async fn on_stop(&self) -> Result<(), RuntimeError> {
        self.scheduler.stop().await.map_err(|e| RuntimeError::Panicked(e.to_string()))
    }

    fn priority(&self) -> i32 {
        priority::SCHEDULER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;
    use tokio::sync::Mutex as TokioMutex;

    struct CountingRuntime {
        count: Arc<AtomicUsize>,
        running: bool,
    }

    #[async_trait]
    impl RunRequestSource for CountingRuntime {
        async fn submit_run(&self, _request: RunRequest) -> bool {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.running
        }

        async fn submit_cancel(&self, _instance_id: u64) -> bool {
            self.running
        }
    }

    struct NoopDispatch {
        calls: Arc<TokioMutex<Vec<String>>>,
    }

    #[async_trait]
    impl DispatchPort for NoopDispatch {
        async fn notify_with_context(&self, _notifier_id: &NotifierId, text: &str, _context: &TaskContext) -> bool {
            self.calls.lock().await.push(text.to_string());
            true
        }
    }

    #[test]
    fn malformed_time_spec_is_rejected_at_construction() {
        let result = ScheduleEntry::new("s1", "T", "C", "tg1", "not a cron expr");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fires_every_tick_and_submits_distinct_requests() {
        let count = Arc::new(AtomicUsize::new(0));
        let runtime = Arc::new(CountingRuntime { count: count.clone(), running: true });
        let dispatch = Arc::new(NoopDispatch { calls: Arc::new(TokioMutex::new(Vec::new())) });

        let entry = ScheduleEntry::new("s1", "T", "C", "tg1", "* * * * * *").unwrap();
        let scheduler = Scheduler::new(vec![entry], ShutdownSignal::new());
        scheduler.start(runtime, dispatch).await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(2500)).await;
        scheduler.stop().await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2, "expected at least 2 ticks, got {}", count.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_submission_notifies_default_channel() {
        let count = Arc::new(AtomicUsize::new(0));
        let runtime = Arc::new(CountingRuntime { count, running: false });
        let calls = Arc::new(TokioMutex::new(Vec::new()));
        let dispatch = Arc::new(NoopDispatch { calls: calls.clone() });

        let entry = ScheduleEntry::new("s1", "T", "C", "tg1", "@every 200ms").unwrap();
        let scheduler = Scheduler::new(vec![entry], ShutdownSignal::new());
        scheduler.start(runtime, dispatch).await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(500)).await;
        scheduler.stop().await.unwrap();

        assert!(!calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn second_start_is_a_noop_warning() {
        let count = Arc::new(AtomicUsize::new(0));
        let runtime = Arc::new(CountingRuntime { count, running: true });
        let dispatch = Arc::new(NoopDispatch { calls: Arc::new(TokioMutex::new(Vec::new())) });

        let entry = ScheduleEntry::new("s1", "T", "C", "tg1", "@every 1h").unwrap();
        let scheduler = Scheduler::new(vec![entry], ShutdownSignal::new());
        scheduler.start(runtime.clone(), dispatch.clone()).await.unwrap();
        scheduler.start(runtime, dispatch).await.unwrap();
        assert!(scheduler.is_running());
        scheduler.stop().await.unwrap();
    }
}
