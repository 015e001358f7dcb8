//! The notifier abstraction and its two-directional split.
//!
//! The bot-style interactive notifier is both a sink (outbound delivery)
//! and a source (inbound commands become task runs). We keep that as one
//! handler object implementing [`NotifierHandler`], but collaborators that
//! only need one direction take the narrower [`MessageSink`] or
//! [`RunRequestSource`] trait so a task implementation never needs the
//! whole dispatcher.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::DispatchError;
use crate::types::{NotifierId, RunRequest, TaskContext, TaskInstanceId};

/// Narrow trait for delivering text to an end user. Consumed by task
/// implementations and by the dispatcher itself.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn notify(&self, text: &str, context: &TaskContext) -> bool;
}

/// Narrow trait for submitting run/cancel requests, consumed by interactive
/// notifiers' `run` loops. A collaborator depending on this never needs the
/// rest of the task runtime.
#[async_trait]
pub trait RunRequestSource: Send + Sync {
    /// Enqueues a run request. Returns false only if the runtime isn't running.
    async fn submit_run(&self, request: RunRequest) -> bool;

    /// Enqueues an advisory cancel. Returns false only if the runtime isn't running.
    async fn submit_cancel(&self, instance_id: TaskInstanceId) -> bool;
}

/// Narrow trait the Task Runtime depends on to reach the dispatcher: deliver
/// a message to a specific notifier (falling back to the default on an
/// unknown ID), without needing the rest of the dispatcher's surface.
#[async_trait]
pub trait DispatchPort: Send + Sync {
    async fn notify_with_context(&self, notifier_id: &NotifierId, text: &str, context: &TaskContext) -> bool;
}

/// Configuration-produced object implementing one notifier transport.
#[async_trait]
pub trait NotifierHandler: Send + Sync {
    fn id(&self) -> &NotifierId;

    /// Best-effort send; returns false on transient transport failure.
    async fn notify(&self, text: &str, context: &TaskContext) -> bool;

    fn supports_rich_text(&self) -> bool;

    /// Long-lived loop; may be a no-op for passive transports. Receives a
    /// shutdown signal and a handle into the task runtime so interactive
    /// handlers can submit run/cancel requests.
    async fn run(
        &self,
        stop_signal: broadcast::Receiver<()>,
        task_runner: std::sync::Arc<dyn RunRequestSource>,
    ) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: NotifierHandler + ?Sized> MessageSink for T {
    async fn notify(&self, text: &str, context: &TaskContext) -> bool {
        NotifierHandler::notify(self, text, context).await
    }
}
