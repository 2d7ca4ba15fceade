use async_trait::async_trait;
use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::db::services as db_services;
use crate::web::models::UserView;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Users service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Users service answered {0}")]
    Status(u16),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Source of the user listing served by `GET /api/users`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<Value>, DirectoryError>;
}

/// Lists users straight from the local database.
pub struct DbUserDirectory {
    db: Arc<DatabaseConnection>,
}

impl DbUserDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DbUserDirectory {
    async fn list_users(&self) -> Result<Vec<Value>, DirectoryError> {
        let users = db_services::get_all_users(&self.db).await?;
        users
            .iter()
            .map(|u| serde_json::to_value(UserView::from(u)).map_err(DirectoryError::from))
            .collect()
    }
}

/// Forwards the listing to the users microservice (`GET {base_url}/users`)
/// and passes its answer through untouched.
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn list_users(&self) -> Result<Vec<Value>, DirectoryError> {
        let response = self.client.get(self.users_url()).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }
        Ok(response.json::<Vec<Value>>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn db_directory_lists_views_without_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408"), fixtures::user(2, "911111111")]])
            .into_connection();
        let users = DbUserDirectory::new(Arc::new(db)).list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1]["phone"], "911111111");
        assert!(users[0].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn db_directory_propagates_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom("down".to_string())])
            .into_connection();
        assert!(matches!(
            DbUserDirectory::new(Arc::new(db)).list_users().await,
            Err(DirectoryError::Database(_))
        ));
    }

    #[test]
    fn users_url_drops_trailing_slash() {
        let directory = HttpUserDirectory::new("http://users:3002/", Duration::from_secs(1)).unwrap();
        assert_eq!(directory.users_url(), "http://users:3002/users");
    }

    #[tokio::test]
    async fn unreachable_users_service_is_an_error() {
        let directory = HttpUserDirectory::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        assert!(matches!(directory.list_users().await, Err(DirectoryError::Request(_))));
    }
}
