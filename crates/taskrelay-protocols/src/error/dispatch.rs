use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatcher not initialised")]
    NotInitialised,

    #[error("dispatcher started with no handlers")]
    NoHandlers,

    #[error("unknown notifier id: {0}")]
    UnknownNotifier(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("dispatcher already started")]
    AlreadyStarted,
}
