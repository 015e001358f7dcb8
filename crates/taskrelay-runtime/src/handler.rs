//! The task handler contract. Concrete task kinds (scrapers, pollers) are a
//! non-goal of this crate — only the seam they plug into lives here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use taskrelay_protocols::{NotifierId, TaskCommandKind, TaskContext, TaskInstanceId, TaskKind};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),
}

/// Shared advisory cancellation flag, checked cooperatively by the handler
/// at its own checkpoints. Never forces termination.
#[derive(Clone)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancellationFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters threaded from the accepted `RunRequest` into the handler.
#[derive(Debug, Clone)]
pub struct TaskRunContext {
    pub instance_id: TaskInstanceId,
    pub kind: TaskKind,
    pub command_kind: TaskCommandKind,
    pub notifier_id: NotifierId,
    pub context: TaskContext,
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Runs to completion or honors `cancel`. The returned string is the
    /// human-readable outcome delivered through the dispatcher.
    async fn run(&self, cancel: CancellationFlag) -> Result<String, TaskError>;
}

/// Produces a [`TaskHandler`] for one `(kind, commandKind)` pair.
pub trait TaskHandlerFactory: Send + Sync {
    fn kind(&self) -> &str;
    fn command_kind(&self) -> &str;
    fn create(&self, ctx: TaskRunContext) -> Box<dyn TaskHandler>;
}

/// Registry key for a `(kind, commandKind)` pair, e.g. `"KURLY:CheckPrice"`.
pub fn factory_key(kind: &str, command_kind: &str) -> String {
    format!("{kind}:{command_kind}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_flag_starts_unset() {
        let flag = CancellationFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn cancellation_flag_clones_share_state() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn factory_key_joins_kind_and_command() {
        assert_eq!(factory_key("KURLY", "CheckPrice"), "KURLY:CheckPrice");
    }
}
