//! Shared runtime scaffolding: the generic registry and the service
//! lifecycle manager used by the scheduler, runtime, dispatcher, and API.

pub mod lifecycle;
pub mod registry;

pub use lifecycle::{priority, LifecycleHook, LifecycleManager, ServiceState, ShutdownSignal};
pub use registry::{BaseRegistry, Registerable};
