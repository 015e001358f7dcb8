//! Shared data model, notifier traits, and error taxonomy for taskrelay.

pub mod error;
pub mod masked;
pub mod notifier;
pub mod types;

pub use masked::{mask, Masked};
pub use notifier::{DispatchPort, MessageSink, NotifierHandler, RunRequestSource};
pub use types::*;
