use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::alert_channel;
use crate::db::enums::{ChannelKind, DeliveryStatus};

/// Records a pending delivery of `alert_id` over `channel`.
pub async fn create_pending_delivery(
    db: &DatabaseConnection,
    alert_id: i32,
    channel: ChannelKind,
    recipient: &str,
) -> Result<alert_channel::Model, DbErr> {
    let model = alert_channel::ActiveModel {
        alert_id: Set(alert_id),
        channel: Set(channel),
        recipient: Set(recipient.to_string()),
        status: Set(DeliveryStatus::Pending),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    model.insert(db).await
}

/// Moves a delivery to `enviado` or `fallido`. Terminal rows are left untouched.
pub async fn finish_delivery(
    db: &DatabaseConnection,
    delivery: alert_channel::Model,
    outcome: Result<(), String>,
) -> Result<alert_channel::Model, DbErr> {
    if delivery.status.is_terminal() {
        return Ok(delivery);
    }
    let mut active = delivery.into_active_model();
    match outcome {
        Ok(()) => {
            active.status = Set(DeliveryStatus::Sent);
            active.sent_at = Set(Some(Utc::now()));
            active.error_message = Set(None);
        }
        Err(message) => {
            active.status = Set(DeliveryStatus::Failed);
            active.error_message = Set(Some(message));
        }
    }
    active.update(db).await
}

pub async fn get_deliveries_for_alert(
    db: &DatabaseConnection,
    alert_id: i32,
) -> Result<Vec<alert_channel::Model>, DbErr> {
    alert_channel::Entity::find()
        .filter(alert_channel::Column::AlertId.eq(alert_id))
        .order_by_asc(alert_channel::Column::Id)
        .all(db)
        .await
}
