use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Gateway configuration. Loaded from an optional TOML file, then overridden
/// by environment variables (after `.env` is read).
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub http_addr: String,
    pub weather_service_addr: String,
    pub rpc_timeout_ms: u64,
    pub users_service_url: Option<String>,
    pub log_dir: String,
    pub default_zone: String,
    pub expiry_sweep_secs: u64,
    pub climate_watch_secs: u64,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub n8n_webhook_url: Option<String>,
    pub n8n_webhook_secret: Option<String>,
    pub sms_recipient: Option<String>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    http_addr: Option<String>,
    weather_service_addr: Option<String>,
    rpc_timeout_ms: Option<u64>,
    users_service_url: Option<String>,
    log_dir: Option<String>,
    default_zone: Option<String>,
    expiry_sweep_secs: Option<u64>,
    climate_watch_secs: Option<u64>,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
    n8n_webhook_url: Option<String>,
    n8n_webhook_secret: Option<String>,
    sms_recipient: Option<String>,
}

fn default_jwt_secret() -> String {
    // Development fallback; production deployments set JWT_SECRET.
    "dev_jwt_secret".to_string()
}

fn default_http_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_weather_service_addr() -> String {
    "127.0.0.1:3003".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_zone() -> String {
    "Huancavelica Centro".to_string()
}

fn read_partial<T>(config_path: Option<&str>) -> Result<T, String>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let Some(path_str) = config_path else {
        return Ok(T::default());
    };
    let path = Path::new(path_str);
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file_config: PartialServerConfig = read_partial(config_path)?;
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Self::merge(env_config, file_config)
    }

    // Environment wins over file.
    fn merge(env: PartialServerConfig, file: PartialServerConfig) -> Result<Self, String> {
        Ok(ServerConfig {
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env
                .jwt_secret
                .or(file.jwt_secret)
                .unwrap_or_else(default_jwt_secret),
            http_addr: env
                .http_addr
                .or(file.http_addr)
                .unwrap_or_else(default_http_addr),
            weather_service_addr: env
                .weather_service_addr
                .or(file.weather_service_addr)
                .unwrap_or_else(default_weather_service_addr),
            rpc_timeout_ms: env.rpc_timeout_ms.or(file.rpc_timeout_ms).unwrap_or(5000),
            users_service_url: env.users_service_url.or(file.users_service_url),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            default_zone: env
                .default_zone
                .or(file.default_zone)
                .unwrap_or_else(default_zone),
            expiry_sweep_secs: env
                .expiry_sweep_secs
                .or(file.expiry_sweep_secs)
                .unwrap_or(300),
            climate_watch_secs: env
                .climate_watch_secs
                .or(file.climate_watch_secs)
                .unwrap_or(0),
            telegram_bot_token: env.telegram_bot_token.or(file.telegram_bot_token),
            telegram_chat_id: env.telegram_chat_id.or(file.telegram_chat_id),
            n8n_webhook_url: env.n8n_webhook_url.or(file.n8n_webhook_url),
            n8n_webhook_secret: env.n8n_webhook_secret.or(file.n8n_webhook_secret),
            sms_recipient: env.sms_recipient.or(file.sms_recipient),
        })
    }
}

#[cfg(test)]
impl ServerConfig {
    /// Defaults with a placeholder database URL and no delivery channels.
    pub(crate) fn for_tests() -> Self {
        let env = PartialServerConfig {
            database_url: Some("postgres://localhost/test".to_string()),
            jwt_secret: Some("test-secret".to_string()),
            ..Default::default()
        };
        Self::merge(env, PartialServerConfig::default()).unwrap()
    }
}

/// Configuration of the `weather-service` binary.
#[derive(Deserialize, Debug, Clone)]
pub struct WeatherServiceConfig {
    pub bind_addr: String,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub weatherapi_key: Option<String>,
    pub default_lat: f64,
    pub default_lon: f64,
    /// Name stored with persisted forecasts.
    pub location_name: String,
    /// Enables `generate_weather_report` when set.
    pub database_url: Option<String>,
    pub log_dir: String,
}

#[derive(Deserialize, Default, Debug)]
struct PartialWeatherServiceConfig {
    bind_addr: Option<String>,
    openweather_api_key: Option<String>,
    openweather_base_url: Option<String>,
    weatherapi_key: Option<String>,
    default_lat: Option<f64>,
    default_lon: Option<f64>,
    location_name: Option<String>,
    database_url: Option<String>,
    log_dir: Option<String>,
}

impl WeatherServiceConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        let file: PartialWeatherServiceConfig = read_partial(config_path)?;
        let env = envy::from_env::<PartialWeatherServiceConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        Ok(WeatherServiceConfig {
            bind_addr: env
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or_else(|| "0.0.0.0:3003".to_string()),
            openweather_api_key: env.openweather_api_key.or(file.openweather_api_key),
            openweather_base_url: env
                .openweather_base_url
                .or(file.openweather_base_url)
                .unwrap_or_else(|| "https://api.openweathermap.org/data/2.5".to_string()),
            weatherapi_key: env.weatherapi_key.or(file.weatherapi_key),
            // Huancavelica
            default_lat: env.default_lat.or(file.default_lat).unwrap_or(-12.7867),
            default_lon: env.default_lon.or(file.default_lon).unwrap_or(-74.9758),
            location_name: env
                .location_name
                .or(file.location_name)
                .unwrap_or_else(|| "Huancavelica".to_string()),
            database_url: env.database_url.or(file.database_url),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
        })
    }
}
