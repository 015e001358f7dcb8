//! Shared data model for the task runtime / scheduler / dispatcher triad.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Selects which concrete task implementation to instantiate (e.g. `"LOTTO"`, `"KURLY"`).
///
/// Finite and known at compile time; the runtime never registers new kinds
/// dynamically (see the scheduler/bot command surface instead).
pub type TaskKind = String;

/// Scopes an operation within a [`TaskKind`] (e.g. `"CheckPrice"`). Unique within a kind.
pub type TaskCommandKind = String;

/// Monotonically increasing identifier assigned by the runtime at acceptance
/// time. Unique for the process lifetime among currently-live instances.
pub type TaskInstanceId = u64;

/// String key into the dispatcher's notifier registry.
pub type NotifierId = String;

/// Opaque per-request key/value bag carried from the originating notifier
/// through the runtime and back into the reply message. Never interpreted
/// by the runtime itself.
pub type TaskContext = HashMap<String, String>;

/// Well-known [`TaskContext`] key used by interactive notifiers to thread a
/// reply back to the inbound message that triggered the run.
pub const CONTEXT_MESSAGE_ID: &str = "messageID";

/// Where a [`RunRequest`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Scheduler,
    User,
    Api,
}

/// A request to run one task instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub kind: TaskKind,
    pub command_kind: TaskCommandKind,
    pub notifier_id: NotifierId,
    pub notify_on_start: bool,
    pub origin: Origin,
    pub context: TaskContext,
}

impl RunRequest {
    pub fn new(
        kind: impl Into<TaskKind>,
        command_kind: impl Into<TaskCommandKind>,
        notifier_id: impl Into<NotifierId>,
        origin: Origin,
    ) -> Self {
        Self {
            kind: kind.into(),
            command_kind: command_kind.into(),
            notifier_id: notifier_id.into(),
            notify_on_start: false,
            origin,
            context: TaskContext::new(),
        }
    }

    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_notify_on_start(mut self, notify_on_start: bool) -> Self {
        self.notify_on_start = notify_on_start;
        self
    }
}

/// A request to advisory-cancel a running task instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CancelRequest {
    pub instance_id: TaskInstanceId,
}

/// HTTP-entry-point application: authenticates inbound notification posts
/// (via `app_key`) and resolves which notifier receives them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub app_key: String,
    pub title: String,
    pub default_notifier_id: NotifierId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_request_builder_defaults_to_no_context() {
        let req = RunRequest::new("LOTTO", "CheckPrice", "tg1", Origin::Api);
        assert!(req.context.is_empty());
        assert!(!req.notify_on_start);
    }

    #[test]
    fn origin_serializes_lowercase() {
        let json = serde_json::to_string(&Origin::Scheduler).unwrap();
        assert_eq!(json, "\"scheduler\"");
    }
}
