use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use std::sync::Arc;

use crate::db::services::AlertFilter;
use crate::services::alert_service;
use crate::services::recommendations::{Recommendation, recommendations_for};
use crate::web::models::{
    AlertFilterQuery, AlertStatusView, AlertView, CreateAlertInput, MaybeUser, UpdateAlertStatusInput,
};
use crate::web::{AppError, AppState};

async fn get_alerts_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AlertFilterQuery>,
) -> Result<Json<Vec<AlertView>>, AppError> {
    let filter = AlertFilter::try_from(query)?;
    Ok(Json(alert_service::get_alerts(&app_state, &filter).await?))
}

async fn get_alert_by_id_handler(
    State(app_state): State<Arc<AppState>>,
    Path(alert_id): Path<i32>,
) -> Result<Json<Option<AlertView>>, AppError> {
    Ok(Json(alert_service::get_alert_by_id(&app_state, alert_id).await?))
}

async fn get_alert_recommendations_handler(Path(alert_type): Path<String>) -> Json<Vec<Recommendation>> {
    Json(recommendations_for(&alert_type))
}

/// The reporter is the authenticated caller when there is one, else the
/// `userId` of the input.
async fn create_alert_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(MaybeUser(user)): Extension<MaybeUser>,
    Json(payload): Json<CreateAlertInput>,
) -> Result<(StatusCode, Json<AlertView>), AppError> {
    let view = alert_service::create_alert(&app_state, payload, user.map(|u| u.id)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_alert_status_handler(
    State(app_state): State<Arc<AppState>>,
    Path(alert_id): Path<i32>,
    Json(payload): Json<UpdateAlertStatusInput>,
) -> Result<Json<AlertStatusView>, AppError> {
    Ok(Json(alert_service::update_alert_status(&app_state, alert_id, payload).await?))
}

pub fn create_alert_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_alerts_handler).post(create_alert_handler))
        .route("/recommendations/{alert_type}", get(get_alert_recommendations_handler))
        .route("/{id}", get(get_alert_by_id_handler))
        .route("/{id}/status", patch(update_alert_status_handler).put(update_alert_status_handler))
}

#[cfg(test)]
mod tests {
    use crate::db::entities::alert;
    use crate::db::fixtures;
    use crate::web::test_support::{get, json_request, send, state};
    use axum::http::StatusCode;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    #[tokio::test]
    async fn lists_alerts_newest_first_as_views() {
        let mut newer = fixtures::alert(2);
        newer.occurred_at = fixtures::fixed_time() + chrono::Duration::hours(1);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![newer, fixtures::alert(1)]])
            .into_connection();
        let (status, body) = send(state(db), get("/api/alerts?type=helada&zone=Acobamba")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], json!(2));
        assert_eq!(body[1]["reportedBy"], json!("weather-service"));
    }

    #[tokio::test]
    async fn unknown_filter_value_is_a_bad_request() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (status, body) = send(state(db), get("/api/alerts?severity=extrema")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Unknown severity: extrema"));
    }

    #[tokio::test]
    async fn missing_alert_is_null() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<alert::Model>::new()])
            .into_connection();
        let (status, body) = send(state(db), get("/api/alerts/77")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(null));
    }

    #[tokio::test]
    async fn recommendations_are_case_insensitive() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (_, body) = send(state(db), get("/api/alerts/recommendations/HELADA")).await;
        assert_eq!(body.as_array().map(Vec::len), Some(4));
        assert_eq!(body[0]["id"], json!("helada-1"));

        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (_, body) = send(state(db), get("/api/alerts/recommendations/temperatura")).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn status_update_of_unknown_alert_is_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<alert::Model>::new()])
            .into_connection();
        let request = json_request("PATCH", "/api/alerts/5/status", json!({ "status": "resuelta" }));
        let (status, _) = send(state(db), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn created_alert_is_returned_with_201() {
        let mut row = fixtures::alert(3);
        row.zone = None;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/alerts",
            json!({
                "title": "Alerta de Helada",
                "description": "Temperatura de -3.0°C detectada",
                "type": "helada",
                "reportedBy": "weather-service"
            }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], json!(3));
        assert_eq!(body["status"], json!("activa"));
    }
}
