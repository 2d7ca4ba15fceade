use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::enums::{AlertStatus, AlertType, Severity};
use crate::db::services::{self as db_services, AlertFilter, NewAlert};
use crate::pubsub::NEW_ALERT_TOPIC;
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::{
    AlertFilterQuery, AlertStatusView, AlertView, CreateAlertInput, UpdateAlertStatusInput,
};

fn parse_list<T: DeserializeOwned>(raw: Option<&str>, field: &str) -> Result<Vec<T>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            serde_json::from_value(Value::String(v.to_lowercase()))
                .map_err(|_| AppError::InvalidInput(format!("Unknown {field}: {v}")))
        })
        .collect()
}

impl TryFrom<AlertFilterQuery> for AlertFilter {
    type Error = AppError;

    fn try_from(query: AlertFilterQuery) -> Result<Self, Self::Error> {
        Ok(AlertFilter {
            types: parse_list::<AlertType>(query.alert_type.as_deref(), "type")?,
            severities: parse_list::<Severity>(query.severity.as_deref(), "severity")?,
            zones: query
                .zone
                .as_deref()
                .map(|z| {
                    z.split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            statuses: parse_list::<AlertStatus>(query.status.as_deref(), "status")?,
            date_from: query.date_from,
            date_to: query.date_to,
        })
    }
}

pub async fn get_alerts(state: &AppState, filter: &AlertFilter) -> Result<Vec<AlertView>, AppError> {
    let rows = db_services::get_alerts_with_reporter(&state.db_pool, filter).await?;
    Ok(rows
        .iter()
        .map(|(alert, reporter)| AlertView::new(alert, reporter.clone()))
        .collect())
}

pub async fn get_alert_by_id(state: &AppState, alert_id: i32) -> Result<Option<AlertView>, AppError> {
    let Some(alert) = db_services::get_alert_by_id(&state.db_pool, alert_id).await? else {
        return Ok(None);
    };
    let reporter = match alert.user_id {
        Some(user_id) => db_services::get_user_by_id(&state.db_pool, user_id)
            .await?
            .map(|u| u.name),
        None => None,
    };
    Ok(Some(AlertView::new(&alert, reporter)))
}

/// Persists a new alert and kicks off everything that follows from it: the
/// `newAlert` publication, the reporter and zone counters and the channel
/// fan-out. Only the insert can fail the call.
pub async fn create_alert(
    state: &AppState,
    input: CreateAlertInput,
    user_id: Option<i32>,
) -> Result<AlertView, AppError> {
    if input.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Alert title is required.".to_string()));
    }
    let now = Utc::now();
    let user_id = user_id.or(input.user_id);

    let new_alert = NewAlert {
        title: input.title,
        description: input.description,
        alert_type: input.alert_type,
        severity: input.severity.unwrap_or_else(|| input.alert_type.default_severity()),
        priority: input.priority.unwrap_or_default(),
        occurred_at: input.time.unwrap_or(now),
        location: input.location,
        zone: input.zone.filter(|z| !z.trim().is_empty()),
        reported_by: input.reported_by,
        user_id,
        expires_at: Some(expiry_for(input.alert_type, now)),
    };

    let alert = db_services::create_alert(&state.db_pool, new_alert).await?;
    info!(alert_id = alert.id, alert_type = %alert.alert_type, zone = ?alert.zone, "Alert created.");

    let view = AlertView::new(&alert, None);
    state.alert_bus.publish(NEW_ALERT_TOPIC, view.clone());

    if let Some(user_id) = user_id {
        if let Err(e) = db_services::increment_reported_alerts(&state.db_pool, user_id).await {
            warn!(alert_id = alert.id, user_id, error = %e, "Failed to bump reported alerts counter.");
        }
    }
    if let Some(zone) = &alert.zone {
        db_services::spawn_zone_counter_update(state.db_pool.clone(), zone.clone(), 1);
    }
    state.dispatcher.spawn_dispatch(alert);

    Ok(view)
}

pub fn expiry_for(alert_type: AlertType, issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::hours(alert_type.expiry_hours())
}

/// Moves an alert to `status`. Leaving `activa` releases the alert's slot in
/// its zone counter.
pub async fn update_alert_status(
    state: &AppState,
    alert_id: i32,
    input: UpdateAlertStatusInput,
) -> Result<AlertStatusView, AppError> {
    let Some((previous, updated)) =
        db_services::update_alert_status(&state.db_pool, alert_id, input.status, input.response_time).await?
    else {
        return Err(AppError::NotFound(format!("Alert {alert_id} not found")));
    };
    info!(alert_id, from = %previous.status, to = %updated.status, "Alert status updated.");

    release_zone_slot(state, &previous.status, &updated.status, updated.zone.as_deref());

    Ok(AlertStatusView {
        id: updated.id,
        title: updated.title,
        status: updated.status,
        response_time: updated.response_time,
    })
}

fn release_zone_slot(state: &AppState, from: &AlertStatus, to: &AlertStatus, zone: Option<&str>) {
    if *from == AlertStatus::Active && *to != AlertStatus::Active {
        if let Some(zone) = zone {
            db_services::spawn_zone_counter_update(state.db_pool.clone(), zone.to_string(), -1);
        }
    }
}

/// Marks every active alert past its expiry as `expirada`. Returns how many
/// were expired.
pub async fn expire_alerts(state: &AppState, now: DateTime<Utc>) -> Result<usize, AppError> {
    let expired = db_services::get_expired_active_alerts(&state.db_pool, now).await?;
    let mut count = 0;
    for alert in expired {
        match db_services::update_alert_status(&state.db_pool, alert.id, AlertStatus::Expired, None).await {
            Ok(Some((previous, updated))) => {
                release_zone_slot(state, &previous.status, &updated.status, updated.zone.as_deref());
                count += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(alert_id = alert.id, error = %e, "Failed to expire alert."),
        }
    }
    Ok(count)
}
