use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::services::notification_service;
use crate::web::models::{CreateNotificationInput, NotificationView, UserIdQuery};
use crate::web::{AppError, AppState};

async fn get_notifications_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    Ok(Json(notification_service::get_notifications(&app_state, query.user_id).await?))
}

async fn get_unread_count_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<Value>, AppError> {
    let count = notification_service::get_unread_count(&app_state, query.user_id).await?;
    Ok(Json(json!({ "count": count })))
}

async fn create_notification_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateNotificationInput>,
) -> Result<(StatusCode, Json<NotificationView>), AppError> {
    let view = notification_service::create_notification(&app_state, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn mark_notification_read_handler(
    State(app_state): State<Arc<AppState>>,
    Path(notification_id): Path<i32>,
) -> Json<bool> {
    Json(notification_service::mark_notification_read(&app_state, notification_id).await)
}

async fn mark_all_as_read_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserIdQuery>,
) -> Json<bool> {
    Json(notification_service::mark_all_as_read(&app_state, query.user_id).await)
}

pub fn create_notification_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_notifications_handler).post(create_notification_handler))
        .route("/unread-count", get(get_unread_count_handler))
        .route("/read-all", patch(mark_all_as_read_handler))
        .route("/{id}/read", patch(mark_notification_read_handler))
}
