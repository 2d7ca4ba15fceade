//! Periodic jobs of the gateway: the alert expiry sweep and the climate
//! watch that turns forecast alerts into stored alerts.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::db::enums::AlertType;
use crate::db::services as db_services;
use crate::rpc::GET_CLIMATE_ALERTS;
use crate::services::alert_service;
use crate::weather::{ClimateAlert, ServiceResponse, parse_forecast_time};
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::CreateAlertInput;

const CLIMATE_WATCH_REPORTER: &str = "weather-service";

pub fn spawn_expiry_sweep(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.expiry_sweep_secs.max(1));
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            match alert_service::expire_alerts(&state, Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => info!(expired, "Expired stale alerts."),
                Err(e) => error!(error = %e, "Alert expiry sweep failed."),
            }
        }
    })
}

/// `None` when `climate_watch_secs` is 0.
pub fn spawn_climate_watch(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    if state.config.climate_watch_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(state.config.climate_watch_secs);
    Some(tokio::spawn(async move {
        let mut interval = time::interval(period);
        loop {
            interval.tick().await;
            match run_climate_watch(&state).await {
                Ok(created) => info!(created, "Climate watch finished."),
                Err(e) => warn!(error = %e, "Climate watch failed."),
            }
        }
    }))
}

/// Asks the weather service for forecast alerts and stores one alert per
/// entry in the default zone. Entries already stored as an active alert of
/// the same type, zone and time are skipped. Returns how many were created.
pub async fn run_climate_watch(state: &AppState) -> Result<usize, AppError> {
    let response = state
        .weather_client
        .send(GET_CLIMATE_ALERTS, Value::Null)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Weather service call failed: {e}")))?;
    let response: ServiceResponse<Vec<ClimateAlert>> = serde_json::from_value(response)?;
    if !response.success {
        return Err(AppError::InternalServerError(
            response.error.unwrap_or(response.message),
        ));
    }

    let mut created = 0;
    for alert in response.data.unwrap_or_default() {
        let input = climate_alert_input(alert, &state.config.default_zone);
        let zone = state.config.default_zone.as_str();
        match db_services::find_active_alert(&state.db_pool, input.alert_type, zone, input.time).await {
            Ok(Some(existing)) => {
                debug!(alert_id = existing.id, alert_type = %input.alert_type, "Climate alert already active.");
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to look up active climate alerts.");
                continue;
            }
        }
        match alert_service::create_alert(state, input, None).await {
            Ok(_) => created += 1,
            Err(e) => warn!(error = %e, "Failed to store climate alert."),
        }
    }
    Ok(created)
}

fn climate_alert_title(alert_type: AlertType) -> &'static str {
    match alert_type {
        AlertType::Frost => "Alerta de Helada",
        AlertType::Rain => "Alerta de Lluvia Intensa",
        AlertType::Hail => "Alerta de Granizada",
        AlertType::Drought => "Alerta de Sequía",
        AlertType::Wind => "Alerta de Viento Fuerte",
        AlertType::Temperature => "Alerta de Temperatura",
    }
}

fn climate_alert_input(alert: ClimateAlert, zone: &str) -> CreateAlertInput {
    CreateAlertInput {
        title: climate_alert_title(alert.tipo).to_string(),
        description: alert.descripcion,
        alert_type: alert.tipo,
        severity: None,
        priority: None,
        time: alert.fecha.as_deref().and_then(parse_forecast_time),
        location: None,
        zone: Some(zone.to_string()),
        reported_by: Some(CLIMATE_WATCH_REPORTER.to_string()),
        user_id: None,
    }
}
