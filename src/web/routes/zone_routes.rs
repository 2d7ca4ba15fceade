use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use std::sync::Arc;

use crate::db::services as db_services;
use crate::web::models::ZoneView;
use crate::web::{AppError, AppState};

async fn get_zones_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<Vec<ZoneView>>, AppError> {
    let zones = db_services::get_zones(&app_state.db_pool).await?;
    Ok(Json(zones.iter().map(ZoneView::from).collect()))
}

async fn get_zone_by_id_handler(
    State(app_state): State<Arc<AppState>>,
    Path(zone_id): Path<i32>,
) -> Result<Json<Option<ZoneView>>, AppError> {
    let zone = db_services::get_zone_by_id(&app_state.db_pool, zone_id).await?;
    Ok(Json(zone.as_ref().map(ZoneView::from)))
}

pub fn create_zone_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_zones_handler))
        .route("/{id}", get(get_zone_by_id_handler))
}

#[cfg(test)]
mod tests {
    use crate::db::entities::zone;
    use crate::db::fixtures;
    use crate::web::test_support::{get, send, state};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    #[tokio::test]
    async fn zones_carry_coordinates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::zone(2, "Acobamba")]])
            .into_connection();
        let (_, body) = send(state(db), get("/api/zones")).await;
        assert_eq!(body[0]["name"], json!("Acobamba"));
        assert_eq!(body[0]["coordinates"]["lat"], json!(-12.8433));
    }

    #[tokio::test]
    async fn unknown_zone_is_null() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<zone::Model>::new()])
            .into_connection();
        let (_, body) = send(state(db), get("/api/zones/42")).await;
        assert_eq!(body, json!(null));
    }
}
