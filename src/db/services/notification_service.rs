use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, prelude::Expr,
};

use crate::db::entities::notification;
use crate::db::enums::Priority;

/// Upper bound on notifications returned per listing.
pub const NOTIFICATION_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub user_id: i32,
}

/// The user's most recent notifications, newest first.
pub async fn get_notifications_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<notification::Model>, DbErr> {
    notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .limit(NOTIFICATION_PAGE_SIZE)
        .all(db)
        .await
}

pub async fn count_unread_notifications(db: &DatabaseConnection, user_id: i32) -> Result<u64, DbErr> {
    notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db)
        .await
}

/// Returns the number of rows changed (0 when the id is unknown).
pub async fn mark_notification_read(db: &DatabaseConnection, notification_id: i32) -> Result<u64, DbErr> {
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::Id.eq(notification_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn mark_all_notifications_read(db: &DatabaseConnection, user_id: i32) -> Result<u64, DbErr> {
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn create_notification(
    db: &DatabaseConnection,
    new_notification: NewNotification,
) -> Result<notification::Model, DbErr> {
    let model = notification::ActiveModel {
        notification_type: Set(new_notification.notification_type),
        title: Set(new_notification.title),
        message: Set(new_notification.message),
        priority: Set(new_notification.priority),
        is_read: Set(false),
        user_id: Set(new_notification.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await
}
