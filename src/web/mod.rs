use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::notifications::AlertDispatcher;
use crate::notifications::models::ChannelConfig;
use crate::pubsub::PubSub;
use crate::rpc::WeatherClient;
use crate::server::config::ServerConfig;
use crate::services::user_directory::{DbUserDirectory, DirectoryError, HttpUserDirectory, UserDirectory};
use crate::web::models::{AlertView, NotificationView};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod ws;

pub use error::AppError;

pub struct AppState {
    pub db_pool: Arc<DatabaseConnection>,
    pub config: Arc<ServerConfig>,
    pub alert_bus: PubSub<AlertView>,
    pub notification_bus: PubSub<NotificationView>,
    pub weather_client: WeatherClient,
    pub user_directory: Arc<dyn UserDirectory>,
    pub dispatcher: Arc<AlertDispatcher>,
}

impl AppState {
    /// Wires the shared services from the configuration. The user listing
    /// goes to the users service when `users_service_url` is set, otherwise
    /// to the local table.
    pub fn new(db_pool: DatabaseConnection, config: Arc<ServerConfig>) -> Result<Self, DirectoryError> {
        let db_pool = Arc::new(db_pool);
        let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);
        let user_directory: Arc<dyn UserDirectory> = match &config.users_service_url {
            Some(url) => Arc::new(HttpUserDirectory::new(url, rpc_timeout)?),
            None => Arc::new(DbUserDirectory::new(db_pool.clone())),
        };
        let dispatcher = Arc::new(AlertDispatcher::new(
            db_pool.clone(),
            ChannelConfig::from_server_config(&config),
        ));

        Ok(Self {
            weather_client: WeatherClient::new(config.weather_service_addr.clone(), rpc_timeout),
            alert_bus: PubSub::default(),
            notification_bus: PubSub::default(),
            user_directory,
            dispatcher,
            db_pool,
            config,
        })
    }
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = routes::rest_routes::create_rest_router()
        .merge(routes::auth_routes::create_auth_router())
        .nest("/ai", routes::ai_routes::create_ai_router())
        .nest("/alerts", routes::alert_routes::create_alert_router())
        .nest("/notifications", routes::notification_routes::create_notification_router())
        .nest("/zones", routes::zone_routes::create_zone_router())
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::optional_auth,
        ));

    Router::new()
        .nest("/api", api)
        .route("/ws/alerts", get(ws::alerts_ws_handler))
        .route("/ws/notifications", get(ws::notifications_ws_handler))
        .with_state(app_state)
        .layer(cors)
}
