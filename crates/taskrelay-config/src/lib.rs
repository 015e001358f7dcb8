//! Configuration schema, loading, and validation for taskrelay.

mod loader;
mod schema;
mod validator;

pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
