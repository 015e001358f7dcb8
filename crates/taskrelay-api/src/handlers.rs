//! Request handlers for the three HTTP routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use taskrelay_protocols::error::ApiError;
use taskrelay_protocols::mask;

use crate::error::ApiErrorResponse;
use crate::health::{ComponentHealth, HealthResponse};
use crate::state::AppState;
use crate::version::VersionInfo;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub app_key: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub application_id: String,
    pub message: String,
    #[serde(default)]
    pub error_occurred: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub result_code: u32,
}

/// `POST /api/v1/notifications?app_key=<key>`.
pub async fn post_notification(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
    Json(body): Json<NotificationRequest>,
) -> Result<Json<NotificationResponse>, ApiErrorResponse> {
    if body.application_id.trim().is_empty() || body.message.trim().is_empty() {
        return Err(ApiError::Validation("application_id and message are required".to_string()).into());
    }

    let application = state
        .applications
        .iter()
        .find(|app| app.id == body.application_id)
        .ok_or_else(|| {
            warn!(application_id = %body.application_id, app_key = %mask(&query.app_key), "rejected notification: unknown application");
            ApiError::Authentication
        })?;

    if application.app_key != query.app_key {
        warn!(application_id = %application.id, app_key = %mask(&query.app_key), "rejected notification: bad app key");
        return Err(ApiError::Authentication.into());
    }

    state
        .dispatcher
        .notify(&application.default_notifier_id, "", &body.message, body.error_occurred)
        .await;

    Ok(Json(NotificationResponse { result_code: 0 }))
}

/// `GET /health`.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut components: HashMap<String, ComponentHealth> = HashMap::new();
    components.insert("scheduler".to_string(), ComponentHealth::running(state.scheduler.is_running()));
    components.insert("runtime".to_string(), ComponentHealth::running(state.runtime.is_running()));
    components.insert("dispatcher".to_string(), ComponentHealth::running(state.dispatcher.is_running()));
    for notifier_id in state.dispatcher.notifier_ids() {
        components.insert(notifier_id, ComponentHealth::healthy());
    }

    Json(state.health.check(components))
}

/// `GET /version`.
pub async fn get_version(State(state): State<Arc<AppState>>) -> Json<VersionInfo> {
    Json(state.version.clone())
}
