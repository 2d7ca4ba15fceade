//! Row builders shared by the mock-database tests.

use chrono::{DateTime, TimeZone, Utc};

use serde_json::json;

use crate::db::entities::{alert, notification, prediction_model, user, verification_code, zone};
use crate::db::enums::{AlertStatus, AlertType, ModelType, RecoveryMethod, Severity};

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 5, 0, 0).unwrap()
}

pub fn alert(id: i32) -> alert::Model {
    alert::Model {
        id,
        title: "Alerta de Helada".to_string(),
        description: "Temperatura de -3.0°C detectada".to_string(),
        alert_type: AlertType::Frost,
        severity: Severity::High,
        priority: Severity::Medium,
        status: AlertStatus::Active,
        is_active: true,
        occurred_at: fixed_time(),
        location: None,
        zone: Some("Acobamba".to_string()),
        reported_by: Some("weather-service".to_string()),
        user_id: None,
        response_time: None,
        expires_at: None,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

pub fn user(id: i32, phone: &str) -> user::Model {
    user::Model {
        id,
        name: "Rosa Quispe".to_string(),
        phone: phone.to_string(),
        email: Some(format!("user{id}@example.com")),
        password_hash: bcrypt::hash("secreto123", 4).unwrap(),
        city: Some("Huancavelica".to_string()),
        zone: Some("Acobamba".to_string()),
        roles: "[\"agricultor\"]".to_string(),
        is_active: true,
        reported_alerts: 0,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

pub fn notification(id: i32, user_id: i32) -> notification::Model {
    notification::Model {
        id,
        notification_type: "alerta".to_string(),
        title: "Nueva Alerta en tu Zona".to_string(),
        message: "Se registró una helada en Acobamba".to_string(),
        priority: Severity::High,
        is_read: false,
        user_id,
        created_at: fixed_time(),
    }
}

pub fn zone(id: i32, name: &str) -> zone::Model {
    zone::Model {
        id,
        name: name.to_string(),
        region: "Huancavelica".to_string(),
        active_alerts: 2,
        population: Some(15000),
        latitude: Some(-12.8433),
        longitude: Some(-74.57),
        created_at: fixed_time(),
    }
}

pub fn verification_code(id: i32, user_id: i32, code: &str) -> verification_code::Model {
    verification_code::Model {
        id,
        code: code.to_string(),
        method: RecoveryMethod::Sms,
        expires_at: Utc::now() + chrono::Duration::minutes(10),
        used: false,
        user_id,
        created_at: Utc::now(),
    }
}

/// `rendimiento = 2 * temperatura + 3 * humedad + 5`.
pub fn yield_model(id: i32) -> prediction_model::Model {
    prediction_model::Model {
        id,
        name: "Rendimiento de papa".to_string(),
        model_type: ModelType::Multivariate,
        features: json!(["temperatura", "humedad"]),
        target: "rendimiento".to_string(),
        coefficients: json!([2.0, 3.0, 5.0]),
        accuracy: 0.92,
        metrics: json!({"mse": 0.5, "rmse": 0.7071, "r2": 0.92}),
        training_rows: 24,
        is_active: true,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}
