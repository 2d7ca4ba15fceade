use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

pub mod entities;
pub mod enums;
pub mod services;

#[cfg(test)]
pub(crate) mod fixtures;

/// Opens the connection pool and applies pending migrations from `migrations/`.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(10).sqlx_logging(false);

    let db = Database::connect(opt).await?;

    sqlx::migrate!("./migrations")
        .run(db.get_postgres_connection_pool())
        .await?;
    info!("Database migrations applied.");

    Ok(db)
}
