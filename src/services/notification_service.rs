use tracing::{info, warn};

use crate::db::services::{self as db_services, NewNotification};
use crate::pubsub::NEW_NOTIFICATION_TOPIC;
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::{CreateNotificationInput, NotificationView};

pub async fn get_notifications(state: &AppState, user_id: i32) -> Result<Vec<NotificationView>, AppError> {
    let rows = db_services::get_notifications_for_user(&state.db_pool, user_id).await?;
    Ok(rows.iter().map(NotificationView::from).collect())
}

pub async fn get_unread_count(state: &AppState, user_id: i32) -> Result<u64, AppError> {
    Ok(db_services::count_unread_notifications(&state.db_pool, user_id).await?)
}

/// `false` when the notification does not exist or the update failed.
pub async fn mark_notification_read(state: &AppState, notification_id: i32) -> bool {
    match db_services::mark_notification_read(&state.db_pool, notification_id).await {
        Ok(rows) => rows > 0,
        Err(e) => {
            warn!(notification_id, error = %e, "Failed to mark notification as read.");
            false
        }
    }
}

pub async fn mark_all_as_read(state: &AppState, user_id: i32) -> bool {
    match db_services::mark_all_notifications_read(&state.db_pool, user_id).await {
        Ok(_) => true,
        Err(e) => {
            warn!(user_id, error = %e, "Failed to mark notifications as read.");
            false
        }
    }
}

/// Stores a notification and publishes it on `newNotification`.
pub async fn create_notification(
    state: &AppState,
    input: CreateNotificationInput,
) -> Result<NotificationView, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Notification title is required.".to_string()));
    }
    let row = db_services::create_notification(
        &state.db_pool,
        NewNotification {
            notification_type: input.notification_type,
            title: input.title,
            message: input.message,
            priority: input.priority.unwrap_or_default(),
            user_id: input.user_id,
        },
    )
    .await?;
    info!(notification_id = row.id, user_id = row.user_id, "Notification created.");

    let view = NotificationView::from(&row);
    state.notification_bus.publish(NEW_NOTIFICATION_TOPIC, view.clone());
    Ok(view)
}
