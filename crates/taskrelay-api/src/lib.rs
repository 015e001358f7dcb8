//! The HTTP entry point: `POST /api/v1/notifications`,
//! `GET /health`, `GET /version`. Routes call through to the Notification
//! Dispatcher and never touch the task runtime or scheduler directly,
//! except to read their `is_running` state for `/health`.

mod error;
mod handlers;
mod health;
mod serve;
mod state;
mod version;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiErrorResponse;
pub use handlers::{NotificationQuery, NotificationRequest, NotificationResponse};
pub use health::{ComponentHealth, HealthEndpoint, HealthResponse, HealthStatus};
pub use serve::ApiLifecycleHook;
pub use state::AppState;
pub use version::VersionInfo;

/// Builds the axum router: `tower_http` CORS + trace layers over a
/// state-carrying `Router`.
///
/// CORS is only enabled when `cors_allow_origins` is non-empty
/// `notify_api.cors.allow_origins`); an empty list leaves the default
/// same-origin browser policy in place rather than defaulting open.
pub fn build_router(state: Arc<AppState>, cors_allow_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/api/v1/notifications", post(handlers::post_notification))
        .route("/health", get(handlers::get_health))
        .route("/version", get(handlers::get_version))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if !cors_allow_origins.is_empty() {
        let origins: Vec<_> = cors_allow_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        router = router.layer(CorsLayer::new().allow_origin(AllowOrigin::list(origins)));
    }

    router
}
