use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown application or bad app key")]
    Authentication,

    #[error("not found: {0}")]
    NotFound(String),
}
