use agri_alerts::db;
use agri_alerts::logging::init_logging;
use agri_alerts::server::config::ServerConfig;
use agri_alerts::server::tasks;
use agri_alerts::version::VERSION;
use agri_alerts::web::{AppState, create_axum_router};

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the simple output.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Gateway version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    // --- Server Config Setup ---
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&server_config.log_dir, "gateway.log");
    info!("Starting gateway, version: {}", VERSION);

    // --- Database Pool Setup ---
    let db_pool = match db::connect(&server_config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to the database.");
            return Err(e);
        }
    };

    let app_state = Arc::new(AppState::new(db_pool, server_config.clone())?);
    info!(
        channels = app_state.dispatcher.channels().len(),
        weather_service = %app_state.weather_client.addr(),
        "Shared state initialized."
    );

    // --- Background Tasks ---
    tasks::spawn_expiry_sweep(app_state.clone());
    if tasks::spawn_climate_watch(app_state.clone()).is_some() {
        info!(every_secs = server_config.climate_watch_secs, "Climate watch enabled.");
    }

    // --- HTTP Server Setup ---
    let app = create_axum_router(app_state);
    let listener = TcpListener::bind(&server_config.http_addr).await?;
    info!("HTTP server listening on {}", server_config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received.");
        })
        .await?;

    Ok(())
}
