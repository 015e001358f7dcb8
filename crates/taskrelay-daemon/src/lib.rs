//! OS signal handling for the service lifecycle.

mod signal;

pub use signal::{install, SignalError};
