use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, prelude::Expr,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::entities::zone;

pub async fn get_zones(db: &DatabaseConnection) -> Result<Vec<zone::Model>, DbErr> {
    zone::Entity::find()
        .order_by_asc(zone::Column::Name)
        .all(db)
        .await
}

pub async fn get_zone_by_id(db: &DatabaseConnection, zone_id: i32) -> Result<Option<zone::Model>, DbErr> {
    zone::Entity::find_by_id(zone_id).one(db).await
}

/// Adds `delta` to the zone's open-alert counter. Decrements never take the
/// counter below zero. Returns the number of rows touched.
pub async fn adjust_zone_active_alerts(
    db: &DatabaseConnection,
    zone_name: &str,
    delta: i32,
) -> Result<u64, DbErr> {
    let mut update = zone::Entity::update_many()
        .col_expr(
            zone::Column::ActiveAlerts,
            Expr::col(zone::Column::ActiveAlerts).add(delta),
        )
        .filter(zone::Column::Name.eq(zone_name));
    if delta < 0 {
        update = update.filter(zone::Column::ActiveAlerts.gte(-delta));
    }
    Ok(update.exec(db).await?.rows_affected)
}

/// Fire-and-forget counter update: failures are logged and swallowed, so the
/// counter may drift from the real number of open alerts.
pub fn spawn_zone_counter_update(
    db: Arc<DatabaseConnection>,
    zone_name: String,
    delta: i32,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match adjust_zone_active_alerts(&db, &zone_name, delta).await {
            Ok(0) => debug!(zone = %zone_name, delta, "Zone counter not updated (unknown zone or already zero)."),
            Ok(_) => debug!(zone = %zone_name, delta, "Zone counter updated."),
            Err(e) => warn!(zone = %zone_name, delta, error = %e, "Failed to update zone counter."),
        }
    })
}
