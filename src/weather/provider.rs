use rand::Rng;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{ForecastRecord, WeatherReading};
use super::risk;
use crate::server::config::WeatherServiceConfig;

const WEATHERAPI_FORECAST_URL: &str = "https://api.weatherapi.com/v1/forecast.json";
const FORECAST_DAYS: u32 = 7;
/// OpenWeather reports wind in m/s under `units=metric`.
const MS_TO_KMH: f64 = 3.6;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Weather API key not configured")]
    MissingApiKey,
    #[error("Weather API error: {0}")]
    Status(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected weather payload: {0}")]
    Payload(String),
}

/// Fetches current conditions and hourly forecasts from the public providers.
pub struct WeatherProvider {
    client: Client,
    openweather_api_key: Option<String>,
    openweather_base_url: String,
    weatherapi_key: Option<String>,
    weatherapi_url: String,
    pub default_lat: f64,
    pub default_lon: f64,
}

impl WeatherProvider {
    pub fn new(config: &WeatherServiceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            openweather_api_key: config.openweather_api_key.clone(),
            openweather_base_url: config.openweather_base_url.trim_end_matches('/').to_string(),
            weatherapi_key: config.weatherapi_key.clone(),
            weatherapi_url: WEATHERAPI_FORECAST_URL.to_string(),
            default_lat: config.default_lat,
            default_lon: config.default_lon,
        }
    }

    /// Current weather at the given point. Without an API key, or when the
    /// provider fails, returns a mock reading instead of an error.
    pub async fn current_weather(&self, lat: f64, lon: f64) -> WeatherReading {
        let Some(api_key) = self.openweather_api_key.as_deref() else {
            warn!("OpenWeatherMap API key not configured, using mock weather data.");
            return mock_reading();
        };
        match self.fetch_current(api_key, lat, lon).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "Failed to fetch current weather, using mock weather data.");
                mock_reading()
            }
        }
    }

    async fn fetch_current(&self, api_key: &str, lat: f64, lon: f64) -> Result<WeatherReading, WeatherError> {
        let url = format!("{}/weather", self.openweather_base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", "metric".to_string()),
                ("lang", "es".to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.to_string()));
        }
        let body: Value = response.json().await?;
        Ok(parse_openweather(&body))
    }

    /// Hourly forecast for the next days at the default location, with risk
    /// flags filled in.
    pub async fn hourly_forecast(&self) -> Result<Vec<ForecastRecord>, WeatherError> {
        let api_key = self.weatherapi_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        let query = format!("{},{}", self.default_lat, self.default_lon);
        let days = FORECAST_DAYS.to_string();
        let response = self
            .client
            .get(&self.weatherapi_url)
            .query(&[
                ("key", api_key),
                ("q", query.as_str()),
                ("days", days.as_str()),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status.to_string()));
        }
        let body: Value = response.json().await?;
        let records = parse_weatherapi_forecast(&body)?;
        info!(records = records.len(), "Fetched hourly forecast.");
        Ok(records)
    }
}

/// Missing fields read as zero or empty.
pub fn parse_openweather(body: &Value) -> WeatherReading {
    let number = |v: &Value| v.as_f64().unwrap_or(0.0);
    WeatherReading {
        temperature: number(&body["main"]["temp"]),
        humidity: number(&body["main"]["humidity"]),
        precipitation: number(&body["rain"]["1h"]),
        wind_speed: number(&body["wind"]["speed"]) * MS_TO_KMH,
        description: body["weather"][0]["description"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    }
}

pub fn parse_weatherapi_forecast(body: &Value) -> Result<Vec<ForecastRecord>, WeatherError> {
    let days = body["forecast"]["forecastday"]
        .as_array()
        .ok_or_else(|| WeatherError::Payload("missing forecast.forecastday".to_string()))?;

    let number = |v: &Value| v.as_f64().unwrap_or(0.0);
    let records = days
        .iter()
        .filter_map(|day| day["hour"].as_array())
        .flatten()
        .map(|hour| {
            risk::annotate(ForecastRecord {
                time: hour["time"].as_str().unwrap_or_default().to_string(),
                temp_c: number(&hour["temp_c"]),
                humidity: number(&hour["humidity"]),
                condition: hour["condition"]["text"].as_str().unwrap_or_default().to_string(),
                rain_probability: number(&hour["chance_of_rain"]),
                precip_mm: number(&hour["precip_mm"]),
                wind_kph: number(&hour["wind_kph"]),
                wind_dir: hour["wind_dir"].as_str().unwrap_or_default().to_string(),
                frost_risk: false,
                drought_risk: false,
            })
        })
        .collect();
    Ok(records)
}

/// Plausible mid-altitude conditions for development without an API key.
pub fn mock_reading() -> WeatherReading {
    let mut rng = rand::rng();
    WeatherReading {
        temperature: 15.0 + rng.random_range(0.0..10.0),
        humidity: 60.0 + rng.random_range(0.0..20.0),
        precipitation: rng.random_range(0.0..5.0),
        wind_speed: 10.0 + rng.random_range(0.0..15.0),
        description: "Parcialmente nublado".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openweather_payload_maps_to_reading() {
        let body = json!({
            "main": {"temp": -2.5, "humidity": 81},
            "rain": {"1h": 0.4},
            "wind": {"speed": 5.1},
            "weather": [{"description": "nubes dispersas"}]
        });
        let reading = parse_openweather(&body);
        assert_eq!(reading.temperature, -2.5);
        assert_eq!(reading.humidity, 81.0);
        assert_eq!(reading.precipitation, 0.4);
        assert!((reading.wind_speed - 18.36).abs() < 1e-9);
        assert_eq!(reading.description, "nubes dispersas");
    }

    #[test]
    fn strong_wind_in_metres_per_second_raises_wind_alert() {
        let body = json!({
            "main": {"temp": 14.0, "humidity": 55},
            "wind": {"speed": 15.0},
            "weather": [{"description": "viento fuerte"}]
        });
        let reading = parse_openweather(&body);
        assert!((reading.wind_speed - 54.0).abs() < 1e-9);

        let alerts = crate::weather::detector::detect_adverse_conditions(&reading);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, crate::db::enums::AlertType::Wind);
    }

    #[test]
    fn missing_openweather_fields_default_to_zero() {
        let reading = parse_openweather(&json!({"main": {"temp": 12}}));
        assert_eq!(reading.temperature, 12.0);
        assert_eq!(reading.precipitation, 0.0);
        assert_eq!(reading.description, "");
    }

    #[test]
    fn weatherapi_hours_are_flattened_and_flagged() {
        let body = json!({
            "forecast": {"forecastday": [
                {"hour": [
                    {"time": "2025-06-01 00:00", "temp_c": -1.0, "humidity": 30, "chance_of_rain": 0,
                     "precip_mm": 0.0, "condition": {"text": "Despejado"}},
                    {"time": "2025-06-01 01:00", "temp_c": 4.0, "humidity": 85, "chance_of_rain": 70,
                     "precip_mm": 2.0, "wind_kph": 14.4, "wind_dir": "NNE", "condition": {"text": "Nublado"}}
                ]},
                {"hour": [
                    {"time": "2025-06-02 00:00", "temp_c": 10.0, "humidity": 60, "chance_of_rain": 20,
                     "precip_mm": 22.0, "condition": {"text": "Lluvia"}}
                ]}
            ]}
        });
        let records = parse_weatherapi_forecast(&body).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].frost_risk && records[0].drought_risk);
        assert!(!records[1].frost_risk && !records[1].drought_risk);
        assert_eq!(records[2].precip_mm, 22.0);
        assert_eq!(records[1].condition, "Nublado");
        assert_eq!(records[1].wind_kph, 14.4);
        assert_eq!(records[1].wind_dir, "NNE");
        assert_eq!(records[0].wind_dir, "");
    }

    #[test]
    fn forecast_without_days_is_a_payload_error() {
        let err = parse_weatherapi_forecast(&json!({"error": "bad key"})).unwrap_err();
        assert!(matches!(err, WeatherError::Payload(_)));
    }

    #[test]
    fn mock_reading_stays_in_range() {
        for _ in 0..50 {
            let r = mock_reading();
            assert!((15.0..25.0).contains(&r.temperature));
            assert!((60.0..80.0).contains(&r.humidity));
            assert!((0.0..5.0).contains(&r.precipitation));
            assert!((10.0..25.0).contains(&r.wind_speed));
        }
    }

    #[tokio::test]
    async fn forecast_requires_api_key() {
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
        let provider = WeatherProvider::new(&config);
        assert!(matches!(provider.hourly_forecast().await, Err(WeatherError::MissingApiKey)));
        // No key: current weather falls back to the mock reading.
        let reading = provider.current_weather(provider.default_lat, provider.default_lon).await;
        assert_eq!(reading.description, "Parcialmente nublado");
    }
}
