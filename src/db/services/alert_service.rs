use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Select, Set,
};
use std::collections::HashMap;

use crate::db::entities::{alert, user};
use crate::db::enums::{AlertStatus, AlertType, Priority, Severity};

/// Optional filters for listing alerts. Empty lists mean "no constraint".
#[derive(Debug, Default, Clone)]
pub struct AlertFilter {
    pub types: Vec<AlertType>,
    pub severities: Vec<Severity>,
    pub zones: Vec<String>,
    pub statuses: Vec<AlertStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Fields of a new alert row. Status, activity and timestamps are set here.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub title: String,
    pub description: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub priority: Priority,
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
    pub zone: Option<String>,
    pub reported_by: Option<String>,
    pub user_id: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub(crate) fn filtered_alerts_query(filter: &AlertFilter) -> Select<alert::Entity> {
    let mut query = alert::Entity::find();
    if !filter.types.is_empty() {
        query = query.filter(alert::Column::AlertType.is_in(filter.types.clone()));
    }
    if !filter.severities.is_empty() {
        query = query.filter(alert::Column::Severity.is_in(filter.severities.clone()));
    }
    if !filter.zones.is_empty() {
        query = query.filter(alert::Column::Zone.is_in(filter.zones.clone()));
    }
    if !filter.statuses.is_empty() {
        query = query.filter(alert::Column::Status.is_in(filter.statuses.clone()));
    }
    if let Some(from) = filter.date_from {
        query = query.filter(alert::Column::OccurredAt.gte(from));
    }
    if let Some(to) = filter.date_to {
        query = query.filter(alert::Column::OccurredAt.lte(to));
    }
    query.order_by_desc(alert::Column::OccurredAt)
}

/// Alerts matching `filter`, newest `occurred_at` first.
pub async fn get_alerts(db: &DatabaseConnection, filter: &AlertFilter) -> Result<Vec<alert::Model>, DbErr> {
    filtered_alerts_query(filter).all(db).await
}

/// Same as [`get_alerts`], paired with the linked reporter's name when the
/// alert has a `user_id`.
pub async fn get_alerts_with_reporter(
    db: &DatabaseConnection,
    filter: &AlertFilter,
) -> Result<Vec<(alert::Model, Option<String>)>, DbErr> {
    let alerts = get_alerts(db, filter).await?;

    let mut user_ids: Vec<i32> = alerts.iter().filter_map(|a| a.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let names: HashMap<i32, String> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect()
    };

    Ok(alerts
        .into_iter()
        .map(|a| {
            let name = a.user_id.and_then(|id| names.get(&id).cloned());
            (a, name)
        })
        .collect())
}

pub async fn get_alert_by_id(db: &DatabaseConnection, alert_id: i32) -> Result<Option<alert::Model>, DbErr> {
    alert::Entity::find_by_id(alert_id).one(db).await
}

pub async fn create_alert(db: &DatabaseConnection, new_alert: NewAlert) -> Result<alert::Model, DbErr> {
    let now = Utc::now();
    let model = alert::ActiveModel {
        title: Set(new_alert.title),
        description: Set(new_alert.description),
        alert_type: Set(new_alert.alert_type),
        severity: Set(new_alert.severity),
        priority: Set(new_alert.priority),
        status: Set(AlertStatus::Active),
        is_active: Set(true),
        occurred_at: Set(new_alert.occurred_at),
        location: Set(new_alert.location),
        zone: Set(new_alert.zone),
        reported_by: Set(new_alert.reported_by),
        user_id: Set(new_alert.user_id),
        expires_at: Set(new_alert.expires_at),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await
}

/// Applies a status transition. Returns the row as it was before the update
/// together with the updated row, or `None` if the alert does not exist.
pub async fn update_alert_status(
    db: &DatabaseConnection,
    alert_id: i32,
    status: AlertStatus,
    response_time: Option<i32>,
) -> Result<Option<(alert::Model, alert::Model)>, DbErr> {
    let Some(previous) = alert::Entity::find_by_id(alert_id).one(db).await? else {
        return Ok(None);
    };

    let mut active = previous.clone().into_active_model();
    active.status = Set(status);
    active.is_active = Set(status == AlertStatus::Active);
    if response_time.is_some() {
        active.response_time = Set(response_time);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    Ok(Some((previous, updated)))
}

/// An active alert of `alert_type` in `zone` that occurred at `occurred_at`.
/// Without a time, any active alert of that type in the zone matches.
pub async fn find_active_alert(
    db: &DatabaseConnection,
    alert_type: AlertType,
    zone: &str,
    occurred_at: Option<DateTime<Utc>>,
) -> Result<Option<alert::Model>, DbErr> {
    active_alert_query(alert_type, zone, occurred_at).one(db).await
}

fn active_alert_query(
    alert_type: AlertType,
    zone: &str,
    occurred_at: Option<DateTime<Utc>>,
) -> Select<alert::Entity> {
    let mut query = alert::Entity::find()
        .filter(alert::Column::Status.eq(AlertStatus::Active))
        .filter(alert::Column::AlertType.eq(alert_type))
        .filter(alert::Column::Zone.eq(zone));
    if let Some(at) = occurred_at {
        query = query.filter(alert::Column::OccurredAt.eq(at));
    }
    query
}

/// Active alerts whose `expires_at` lies before `now`.
pub async fn get_expired_active_alerts(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<alert::Model>, DbErr> {
    alert::Entity::find()
        .filter(alert::Column::Status.eq(AlertStatus::Active))
        .filter(alert::Column::ExpiresAt.lt(now))
        .all(db)
        .await
}
