use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::entities::{alert, notification, prediction_model, user, zone};
use crate::db::enums::{AlertStatus, AlertType, ModelType, Priority, RecoveryMethod, Severity};
use crate::weather::WeatherReading;
use crate::db::services::user_roles;

pub(crate) fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// --- Auth ---

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password: String,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecoverPasswordRequest {
    /// Phone number or email address.
    pub identifier: String,
    pub method: RecoveryMethod,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub phone: String,
    /// Recovery code issued by `recover-password`.
    pub code: String,
    pub new_password: String,
}

/// `{token, user}` returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserView,
}

// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // normalized phone
    pub user_id: i32,
    pub exp: usize,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub phone: String,
    pub claims: Claims,
}

/// Request extension set on every `/api` request: the caller, if a valid
/// token was presented.
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

// --- Users ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub roles: Vec<String>,
    pub is_active: bool,
    pub reported_alerts: i32,
    pub created_at: String,
}

impl From<&user::Model> for UserView {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            phone: u.phone.clone(),
            email: u.email.clone(),
            city: u.city.clone(),
            zone: u.zone.clone(),
            roles: user_roles(u),
            is_active: u.is_active,
            reported_alerts: u.reported_alerts,
            created_at: iso(u.created_at),
        }
    }
}

// --- Alerts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertInput {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Option<Severity>,
    pub priority: Option<Priority>,
    /// When the condition was observed; defaults to now.
    pub time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub zone: Option<String>,
    pub reported_by: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertStatusInput {
    pub status: AlertStatus,
    pub response_time: Option<i32>,
}

/// Query string of `GET /api/alerts`. List filters are comma separated,
/// e.g. `?type=helada,granizada&zone=Acobamba`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertFilterQuery {
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub zone: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub id: i32,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub priority: Priority,
    pub status: AlertStatus,
    pub time: String,
    pub location: Option<String>,
    pub zone: Option<String>,
    pub reported_by: Option<String>,
    pub reported_at: String,
    pub response_time: Option<i32>,
    pub expires_at: Option<String>,
}

impl AlertView {
    /// `reporter_name` wins over the free-text `reported_by` column.
    pub fn new(a: &alert::Model, reporter_name: Option<String>) -> Self {
        Self {
            id: a.id,
            title: a.title.clone(),
            description: a.description.clone(),
            alert_type: a.alert_type,
            severity: a.severity,
            priority: a.priority,
            status: a.status,
            time: iso(a.occurred_at),
            location: a.location.clone(),
            zone: a.zone.clone(),
            reported_by: reporter_name.or_else(|| a.reported_by.clone()),
            reported_at: iso(a.created_at),
            response_time: a.response_time,
            expires_at: a.expires_at.map(iso),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStatusView {
    pub id: i32,
    pub title: String,
    pub status: AlertStatus,
    pub response_time: Option<i32>,
}

// --- Notifications ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationInput {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: Option<Priority>,
    pub user_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSubscriptionQuery {
    pub user_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertSubscriptionQuery {
    pub zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: i32,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    pub read: bool,
    pub priority: Priority,
    pub user_id: i32,
}

impl From<&notification::Model> for NotificationView {
    fn from(n: &notification::Model) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            timestamp: iso(n.created_at),
            read: n.is_read,
            priority: n.priority,
            user_id: n.user_id,
        }
    }
}

// --- Zones ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneView {
    pub id: i32,
    pub name: String,
    pub region: String,
    pub active_alerts: i32,
    pub population: Option<i32>,
    pub coordinates: Coordinates,
}

impl From<&zone::Model> for ZoneView {
    fn from(z: &zone::Model) -> Self {
        Self {
            id: z.id,
            name: z.name.clone(),
            region: z.region.clone(),
            active_alerts: z.active_alerts,
            population: z.population,
            coordinates: Coordinates {
                lat: z.latitude,
                lng: z.longitude,
            },
        }
    }
}

// --- Prediction models ---

/// Training rows arrive inline as objects keyed by column name. Numbers may
/// be JSON numbers or numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainModelRequest {
    pub name: String,
    #[serde(rename = "type", alias = "modelType")]
    pub model_type: ModelType,
    pub features: Vec<String>,
    pub target: String,
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub model_id: i32,
    pub input_data: Vec<f64>,
    #[serde(default)]
    pub include_weather: bool,
    pub location: Option<Location>,
}

/// `input_data` is either a list in feature order or an object keyed by
/// feature name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictWithWeatherRequest {
    pub model_id: i32,
    pub input_data: serde_json::Value,
    pub weather_data: Option<WeatherReading>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub input_data: serde_json::Map<String, serde_json::Value>,
    pub weather_data: Option<WeatherReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfoView {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub accuracy: f64,
    pub metrics: serde_json::Value,
    pub features: Vec<String>,
    pub target: String,
    pub training_rows: i32,
    pub is_active: bool,
    pub created_at: String,
    pub last_trained: String,
}

impl From<&prediction_model::Model> for ModelInfoView {
    fn from(m: &prediction_model::Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            model_type: m.model_type,
            accuracy: m.accuracy,
            metrics: m.metrics.clone(),
            features: m.feature_names(),
            target: m.target.clone(),
            training_rows: m.training_rows,
            is_active: m.is_active,
            created_at: iso(m.created_at),
            last_trained: iso(m.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    pub prediction: f64,
    pub confidence: f64,
    pub model_used: String,
    pub input_data: Vec<f64>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_influence: Option<f64>,
}

/// Per-model predictions for one input, plus their mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub predictions: Vec<PredictionView>,
    pub average_prediction: Option<f64>,
    pub average_confidence: Option<f64>,
    pub timestamp: String,
}
