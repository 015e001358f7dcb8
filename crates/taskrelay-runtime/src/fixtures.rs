//! `ECHO` task kind: a built-in fixture, not a real scraper. It exists so
//! the end-to-end tests have a concrete task to invoke
//! without this crate depending on any real task implementation (a
//! non-goal).

use async_trait::async_trait;

use crate::handler::{
    CancellationFlag, TaskError, TaskHandler, TaskHandlerFactory, TaskRunContext,
};

/// Echoes back the `message` entry of the run's context, or a fixed string
/// if absent. Checks its cancellation flag once before "working" so the
/// cancellation end-to-end test has somewhere to
/// observe it.
pub struct EchoTaskHandler {
    ctx: TaskRunContext,
}

#[async_trait]
impl TaskHandler for EchoTaskHandler {
    async fn run(&self, cancel: CancellationFlag) -> Result<String, TaskError> {
        if cancel.is_cancelled() {
            return Err(TaskError::Failed("cancelled before start".to_string()));
        }

        tokio::task::yield_now().await;

        if cancel.is_cancelled() {
            return Err(TaskError::Failed("cancelled".to_string()));
        }

        let message = self
            .ctx
            .context
            .get("message")
            .cloned()
            .unwrap_or_else(|| "echo".to_string());
        Ok(message)
    }
}

pub struct EchoTaskHandlerFactory;

impl TaskHandlerFactory for EchoTaskHandlerFactory {
    fn kind(&self) -> &str {
        "ECHO"
    }

    fn command_kind(&self) -> &str {
        "Say"
    }

    fn create(&self, ctx: TaskRunContext) -> Box<dyn TaskHandler> {
        Box::new(EchoTaskHandler { ctx })
    }
}
