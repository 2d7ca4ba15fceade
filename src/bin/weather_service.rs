use agri_alerts::db;
use agri_alerts::logging::init_logging;
use agri_alerts::rpc;
use agri_alerts::server::config::WeatherServiceConfig;
use agri_alerts::version::VERSION;
use agri_alerts::weather::{WeatherProvider, WeatherService};

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("Weather service version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    let config = match WeatherServiceConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load weather service configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir, "weather-service.log");
    info!("Starting weather service, version: {}", VERSION);
    if config.openweather_api_key.is_none() {
        warn!("OPENWEATHER_API_KEY not set, current weather will be simulated.");
    }
    if config.weatherapi_key.is_none() {
        warn!("WEATHERAPI_KEY not set, climate alerts will be empty.");
    }

    let mut service = WeatherService::new(WeatherProvider::new(&config));
    match &config.database_url {
        Some(database_url) => match db::connect(database_url).await {
            Ok(db_pool) => {
                info!(location = %config.location_name, "Forecast reports will be stored.");
                service = service.with_forecast_store(Arc::new(db_pool), config.location_name.clone());
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to the database.");
                return Err(e);
            }
        },
        None => warn!("DATABASE_URL not set, weather reports will not be stored."),
    }
    let service = Arc::new(service);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Weather RPC server listening on {}", config.bind_addr);

    rpc::serve(listener, service).await?;
    Ok(())
}
