use thiserror::Error;

use crate::types::TaskInstanceId;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("task runtime is not running")]
    NotRunning,

    #[error("task runtime already started")]
    AlreadyStarted,

    #[error("unknown task kind: {kind}:{command_kind}")]
    UnknownKind { kind: String, command_kind: String },

    #[error("no live instance with id {0}")]
    UnknownInstance(TaskInstanceId),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("shutdown timed out waiting for {0} task(s) to finish")]
    ShutdownTimeout(usize),

    #[error("failed to bind HTTP listener: {0}")]
    BindFailed(String),
}
