pub mod detector;
pub mod models;
pub mod provider;
pub mod risk;
pub mod service;

pub use detector::detect_adverse_conditions;
pub use models::{
    ClimateAlert, DetectedAlert, ForecastRecord, ForecastSummary, ServiceResponse, WeatherReading, WeatherReport,
    parse_forecast_time,
};
pub use provider::{WeatherError, WeatherProvider};
pub use service::WeatherService;
