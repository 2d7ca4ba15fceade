use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::{AlertType, Severity};

/// Current conditions at a location, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// °C
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    /// %
    #[serde(rename = "humedad")]
    pub humidity: f64,
    /// mm in the last hour
    #[serde(rename = "precipitacion")]
    pub precipitation: f64,
    /// km/h
    #[serde(rename = "velocidadViento")]
    pub wind_speed: f64,
    #[serde(rename = "descripcion", default)]
    pub description: String,
}

/// An adverse condition found in a [`WeatherReading`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedAlert {
    #[serde(rename = "tipo")]
    pub alert_type: AlertType,
    #[serde(rename = "severidad")]
    pub severity: Severity,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

/// Forecast times come as local wall-clock time of the region (UTC-5).
const FORECAST_UTC_OFFSET_SECS: i32 = -5 * 3600;

/// Parses `YYYY-MM-DD HH:MM` forecast times.
pub fn parse_forecast_time(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M").ok()?;
    let offset = FixedOffset::east_opt(FORECAST_UTC_OFFSET_SECS)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

/// One hour of forecast data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(rename = "fecha_hora")]
    pub time: String,
    pub temp_c: f64,
    #[serde(rename = "humedad")]
    pub humidity: f64,
    /// Condition text as reported by the provider, e.g. "Parcialmente nublado".
    #[serde(rename = "clima")]
    pub condition: String,
    /// Chance of rain, 0 to 100.
    #[serde(rename = "prob_lluvia")]
    pub rain_probability: f64,
    pub precip_mm: f64,
    #[serde(default)]
    pub wind_kph: f64,
    /// Compass point, e.g. "NNE".
    #[serde(rename = "direccion_viento", default)]
    pub wind_dir: String,
    #[serde(rename = "riesgo_helada", default)]
    pub frost_risk: bool,
    #[serde(rename = "riesgo_sequia", default)]
    pub drought_risk: bool,
}

/// Alert raised from forecast data, consumed by the gateway's climate watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateAlert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fecha: Option<String>,
    pub tipo: AlertType,
    pub descripcion: String,
}

/// `{current, alerts}` payload of `get_weather_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: WeatherReading,
    pub alerts: Vec<DetectedAlert>,
}

/// Result of `generate_weather_report`: the forecast hours fetched and how
/// many of them were stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub record_count: u64,
    pub forecasts: Vec<ForecastRecord>,
}

/// Envelope every weather-service handler replies with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}
