//! Converts `ApiError` into an HTTP response. Lives here (not on
//! `ApiError` itself) because `IntoResponse` and `ApiError` are both
//! foreign to this crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use taskrelay_protocols::error::ApiError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiErrorResponse(pub ApiError);

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Authentication => (StatusCode::UNAUTHORIZED, "unknown application or bad app key".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}
