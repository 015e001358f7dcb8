//! The Task Runtime: instance ID generation, the run/cancel/done event
//! loop, dispatch to per-task handler implementations, lifetime tracking
//! in one place.

mod factory;
mod fixtures;
mod handler;
mod runtime;
mod stats;

pub use factory::FactoryRegistry;
pub use fixtures::{EchoTaskHandler, EchoTaskHandlerFactory};
pub use handler::{
    factory_key, CancellationFlag, TaskError, TaskHandler, TaskHandlerFactory, TaskRunContext,
};
pub use runtime::{RuntimeLifecycleHook, TaskRuntime};
pub use stats::{RuntimeStats, RuntimeStatsSnapshot};
