//! Risk flags and alert rules over hourly forecast records.

use super::models::{ClimateAlert, ForecastRecord};
use crate::db::enums::AlertType;

pub fn frost_risk(temp_c: f64) -> bool {
    temp_c <= 0.0
}

/// `rain_probability` is a percentage.
pub fn drought_risk(rain_probability: f64, humidity: f64) -> bool {
    rain_probability < 10.0 && humidity < 40.0
}

/// Fills in the risk flags of a record from its measurements.
pub fn annotate(mut record: ForecastRecord) -> ForecastRecord {
    record.frost_risk = frost_risk(record.temp_c);
    record.drought_risk = drought_risk(record.rain_probability, record.humidity);
    record
}

/// Climate alerts for a forecast, one per matching rule per record, in
/// record order.
pub fn climate_alerts(records: &[ForecastRecord]) -> Vec<ClimateAlert> {
    let mut alerts = Vec::new();
    for record in records {
        if record.temp_c < 0.0 {
            alerts.push(ClimateAlert {
                fecha: Some(record.time.clone()),
                tipo: AlertType::Frost,
                descripcion: "Riesgo de helada en Huancavelica".to_string(),
            });
        }
        if record.precip_mm > 20.0 {
            alerts.push(ClimateAlert {
                fecha: Some(record.time.clone()),
                tipo: AlertType::Rain,
                descripcion: "Lluvia intensa posible".to_string(),
            });
        }
        let hail_temp = (0.0..=5.0).contains(&record.temp_c);
        if hail_temp && record.humidity > 80.0 && record.condition.to_lowercase().contains("nublado") {
            alerts.push(ClimateAlert {
                fecha: Some(record.time.clone()),
                tipo: AlertType::Hail,
                descripcion: "Riesgo de granizada".to_string(),
            });
        }
    }
    alerts
}
