//! Fixed threshold rules that turn a weather reading into alerts.

use super::models::{DetectedAlert, WeatherReading};
use crate::db::enums::{AlertType, Severity};

const FROST_MAX_TEMP_C: f64 = 0.0;
const HEAVY_RAIN_MIN_MM: f64 = 50.0;
const HIGH_WIND_MIN_KMH: f64 = 40.0;
const DROUGHT_MIN_TEMP_C: f64 = 30.0;
const DROUGHT_MAX_HUMIDITY: f64 = 30.0;

/// Evaluates every rule independently, in a fixed order: frost, heavy rain,
/// high wind, drought. All comparisons are strict.
pub fn detect_adverse_conditions(reading: &WeatherReading) -> Vec<DetectedAlert> {
    let mut alerts = Vec::new();

    if reading.temperature < FROST_MAX_TEMP_C {
        alerts.push(DetectedAlert {
            alert_type: AlertType::Frost,
            severity: Severity::High,
            title: "Alerta de Helada".to_string(),
            description: format!(
                "Temperatura de {}°C. Riesgo de daño a cultivos.",
                reading.temperature
            ),
        });
    }

    if reading.precipitation > HEAVY_RAIN_MIN_MM {
        alerts.push(DetectedAlert {
            alert_type: AlertType::Rain,
            severity: Severity::High,
            title: "Lluvia Intensa".to_string(),
            description: format!(
                "Precipitación de {}mm. Riesgo de inundación.",
                reading.precipitation
            ),
        });
    }

    if reading.wind_speed > HIGH_WIND_MIN_KMH {
        alerts.push(DetectedAlert {
            alert_type: AlertType::Wind,
            severity: Severity::Medium,
            title: "Vientos Fuertes".to_string(),
            description: format!(
                "Vientos de {} km/h. Proteger estructuras.",
                reading.wind_speed
            ),
        });
    }

    if reading.temperature > DROUGHT_MIN_TEMP_C && reading.humidity < DROUGHT_MAX_HUMIDITY {
        alerts.push(DetectedAlert {
            alert_type: AlertType::Drought,
            severity: Severity::Medium,
            title: "Condiciones de Sequía".to_string(),
            description: format!(
                "Temperatura {}°C y humedad {}%. Riego necesario.",
                reading.temperature, reading.humidity
            ),
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64, humidity: f64, precipitation: f64, wind_speed: f64) -> WeatherReading {
        WeatherReading {
            temperature,
            humidity,
            precipitation,
            wind_speed,
            description: String::new(),
        }
    }

    fn types(alerts: &[DetectedAlert]) -> Vec<AlertType> {
        alerts.iter().map(|a| a.alert_type).collect()
    }

    #[test]
    fn freezing_reading_yields_exactly_one_frost_alert() {
        let alerts = detect_adverse_conditions(&reading(-5.0, 50.0, 0.0, 0.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Frost);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[0].title, "Alerta de Helada");
        assert_eq!(alerts[0].description, "Temperatura de -5°C. Riesgo de daño a cultivos.");
    }

    #[test]
    fn hot_dry_reading_includes_drought() {
        let alerts = detect_adverse_conditions(&reading(35.0, 10.0, 0.0, 0.0));
        assert!(types(&alerts).contains(&AlertType::Drought));
        assert_eq!(
            alerts[0].description,
            "Temperatura 35°C y humedad 10%. Riego necesario."
        );
    }

    #[test]
    fn thresholds_are_strict() {
        assert!(detect_adverse_conditions(&reading(0.0, 50.0, 50.0, 40.0)).is_empty());
        assert!(detect_adverse_conditions(&reading(30.0, 29.0, 0.0, 0.0)).is_empty());
        assert!(detect_adverse_conditions(&reading(31.0, 30.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn rules_fire_independently_in_order() {
        let alerts = detect_adverse_conditions(&reading(-1.0, 90.0, 60.5, 45.0));
        assert_eq!(
            types(&alerts),
            vec![AlertType::Frost, AlertType::Rain, AlertType::Wind]
        );
        assert_eq!(alerts[1].description, "Precipitación de 60.5mm. Riesgo de inundación.");
        assert_eq!(alerts[2].severity, Severity::Medium);
    }

    #[test]
    fn mild_reading_is_quiet() {
        assert!(detect_adverse_conditions(&reading(18.0, 70.0, 2.0, 15.0)).is_empty());
    }
}
