use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use super::detector::detect_adverse_conditions;
use super::models::{ClimateAlert, ForecastRecord, ForecastSummary, ServiceResponse, WeatherReport};
use super::provider::WeatherProvider;
use super::risk::climate_alerts;
use crate::db::services::{self as db_services, ForecastLocation};
use crate::rpc::{GENERATE_WEATHER_REPORT, GET_CLIMATE_ALERTS, GET_WEATHER_DATA, RpcError, RpcHandler};

const REPORT_FAILED: &str = "Error al generar reporte meteorológico";

/// Where fetched forecasts are persisted.
struct ForecastStore {
    db: Arc<DatabaseConnection>,
    location: ForecastLocation,
}

/// Message handlers of the weather service.
pub struct WeatherService {
    provider: WeatherProvider,
    store: Option<ForecastStore>,
}

impl WeatherService {
    pub fn new(provider: WeatherProvider) -> Self {
        Self { provider, store: None }
    }

    /// Enables `generate_weather_report`, storing forecasts for the
    /// provider's default location under `location_name`.
    pub fn with_forecast_store(mut self, db: Arc<DatabaseConnection>, location_name: impl Into<String>) -> Self {
        let location = ForecastLocation {
            name: location_name.into(),
            latitude: self.provider.default_lat,
            longitude: self.provider.default_lon,
        };
        self.store = Some(ForecastStore { db, location });
        self
    }

    /// Current conditions plus the alerts they trigger. `data` may carry
    /// `lat`/`lon`; the configured location is used otherwise.
    pub async fn get_weather_data(&self, data: &Value) -> ServiceResponse<WeatherReport> {
        let lat = data.get("lat").and_then(Value::as_f64).unwrap_or(self.provider.default_lat);
        let lon = data.get("lon").and_then(Value::as_f64).unwrap_or(self.provider.default_lon);
        info!(lat, lon, "Fetching current weather.");

        let current = self.provider.current_weather(lat, lon).await;
        let alerts = detect_adverse_conditions(&current);
        ServiceResponse::ok(
            "Datos meteorológicos obtenidos exitosamente",
            WeatherReport { current, alerts },
        )
    }

    pub async fn get_climate_alerts(&self) -> ServiceResponse<Vec<ClimateAlert>> {
        match self.provider.hourly_forecast().await {
            Ok(records) => {
                let alerts = climate_alerts(&records);
                info!(records = records.len(), alerts = alerts.len(), "Evaluated forecast for climate alerts.");
                ServiceResponse::ok("Alertas climáticas generadas", alerts)
            }
            Err(e) => {
                error!(error = %e, "Failed to evaluate forecast.");
                ServiceResponse::failed("Error al obtener datos meteorológicos", e.to_string())
            }
        }
    }

    /// Fetches the hourly forecast and persists it.
    pub async fn generate_weather_report(&self) -> ServiceResponse<ForecastSummary> {
        if self.store.is_none() {
            return ServiceResponse::failed(REPORT_FAILED, "Forecast storage not configured");
        }
        match self.provider.hourly_forecast().await {
            Ok(records) => self.store_forecast(records).await,
            Err(e) => {
                error!(error = %e, "Failed to fetch forecast for report.");
                ServiceResponse::failed(REPORT_FAILED, e.to_string())
            }
        }
    }

    async fn store_forecast(&self, records: Vec<ForecastRecord>) -> ServiceResponse<ForecastSummary> {
        let Some(store) = &self.store else {
            return ServiceResponse::failed(REPORT_FAILED, "Forecast storage not configured");
        };
        if records.is_empty() {
            return ServiceResponse::failed("No se obtuvieron datos de pronóstico", "Empty forecast");
        }
        match db_services::save_forecasts(&store.db, &store.location, &records).await {
            Ok(record_count) => {
                info!(location = %store.location.name, record_count, "Forecast report stored.");
                ServiceResponse::ok(
                    "Reporte meteorológico generado y guardado",
                    ForecastSummary { record_count, forecasts: records },
                )
            }
            Err(e) => {
                error!(error = %e, "Failed to store forecast report.");
                ServiceResponse::failed(REPORT_FAILED, e.to_string())
            }
        }
    }
}

#[async_trait]
impl RpcHandler for WeatherService {
    async fn handle(&self, pattern: &str, data: Value) -> Result<Value, RpcError> {
        match pattern {
            GET_WEATHER_DATA => Ok(serde_json::to_value(self.get_weather_data(&data).await)?),
            GET_CLIMATE_ALERTS => Ok(serde_json::to_value(self.get_climate_alerts().await)?),
            GENERATE_WEATHER_REPORT => Ok(serde_json::to_value(self.generate_weather_report().await)?),
            _ => Err(RpcError::NoHandler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::WeatherServiceConfig;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn service() -> WeatherService {
        let config = WeatherServiceConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            openweather_api_key: None,
            openweather_base_url: "http://127.0.0.1:9".to_string(),
            weatherapi_key: None,
            default_lat: -12.7867,
            default_lon: -74.9758,
            location_name: "Huancavelica".to_string(),
            database_url: None,
            log_dir: "logs".to_string(),
        };
        WeatherService::new(WeatherProvider::new(&config))
    }

    #[tokio::test]
    async fn weather_data_envelope_has_current_and_alerts() {
        let value = service().handle(GET_WEATHER_DATA, json!({})).await.unwrap();
        assert_eq!(value["success"], json!(true));
        assert!(value["data"]["current"]["temperatura"].is_number());
        // Mock conditions never cross a threshold.
        assert_eq!(value["data"]["alerts"], json!([]));
    }

    #[tokio::test]
    async fn climate_alerts_without_forecast_key_fail_softly() {
        let value = service().handle(GET_CLIMATE_ALERTS, Value::Null).await.unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("Weather API key not configured"));
    }

    #[tokio::test]
    async fn unknown_pattern_has_no_handler() {
        let err = service().handle("get_weather_history", Value::Null).await.unwrap_err();
        assert!(matches!(err, RpcError::NoHandler));
    }

    fn stored_service(rows_affected: u64) -> WeatherService {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected,
            }])
            .into_connection();
        service().with_forecast_store(Arc::new(db), "Huancavelica")
    }

    fn hour(time: &str) -> ForecastRecord {
        ForecastRecord {
            time: time.to_string(),
            temp_c: 6.0,
            humidity: 70.0,
            condition: "Nublado".to_string(),
            rain_probability: 40.0,
            precip_mm: 1.2,
            wind_kph: 9.0,
            wind_dir: "E".to_string(),
            frost_risk: false,
            drought_risk: false,
        }
    }

    #[tokio::test]
    async fn report_without_storage_fails_softly() {
        let value = service().handle(GENERATE_WEATHER_REPORT, Value::Null).await.unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("Forecast storage not configured"));
    }

    #[tokio::test]
    async fn report_without_forecast_key_reports_the_provider_error() {
        let value = stored_service(0).handle(GENERATE_WEATHER_REPORT, Value::Null).await.unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("Weather API key not configured"));
    }

    #[tokio::test]
    async fn stored_forecast_reports_the_record_count() {
        let service = stored_service(2);
        let response = service
            .store_forecast(vec![hour("2025-06-01 00:00"), hour("2025-06-01 01:00")])
            .await;
        assert!(response.success);
        let summary = response.data.unwrap();
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.forecasts.len(), 2);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["recordCount"], json!(2));
    }

    #[tokio::test]
    async fn empty_forecast_is_not_a_report() {
        let response = stored_service(0).store_forecast(Vec::new()).await;
        assert!(!response.success);
        assert_eq!(response.message, "No se obtuvieron datos de pronóstico");
    }
}
