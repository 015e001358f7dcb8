//! The log notifier: always present as a safety-net channel. Writes
//! every message to the structured log instead of an external
//! transport, and is never an interactive notifier.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{info, warn};

use taskrelay_protocols::error::DispatchError;
use taskrelay_protocols::{NotifierHandler, NotifierId, RunRequestSource, TaskContext};

pub struct LogNotifier {
    id: NotifierId,
}

impl LogNotifier {
    pub fn new(id: impl Into<NotifierId>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl NotifierHandler for LogNotifier {
    fn id(&self) -> &NotifierId {
        &self.id
    }

    async fn notify(&self, text: &str, context: &TaskContext) -> bool {
        if text.starts_with("[ERROR]") {
            warn!(notifier_id = %self.id, ?context, "{}", text);
        } else {
            info!(notifier_id = %self.id, ?context, "{}", text);
        }
        true
    }

    fn supports_rich_text(&self) -> bool {
        false
    }

    async fn run(
        &self,
        mut stop_signal: broadcast::Receiver<()>,
        _task_runner: std::sync::Arc<dyn RunRequestSource>,
    ) -> Result<(), DispatchError> {
        let _ = stop_signal.recv().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_always_succeeds() {
        let notifier = LogNotifier::new("log");
        assert!(notifier.notify("hello", &TaskContext::new()).await);
        assert!(notifier.notify("[ERROR] boom", &TaskContext::new()).await);
    }

    #[test]
    fn does_not_support_rich_text() {
        assert!(!LogNotifier::new("log").supports_rich_text());
    }
}
