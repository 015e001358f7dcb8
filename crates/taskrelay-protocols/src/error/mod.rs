//! Error types, one file per domain, mirroring the rest of the workspace.

mod api;
mod config;
mod dispatch;
mod runtime;
mod scheduler;

pub use api::ApiError;
pub use config::ConfigError;
pub use dispatch::DispatchError;
pub use runtime::RuntimeError;
pub use scheduler::SchedulerError;
