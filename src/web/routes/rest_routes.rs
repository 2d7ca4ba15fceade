use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

use crate::db::entities::weather_forecast;
use crate::db::services as db_services;
use crate::rpc::{GENERATE_WEATHER_REPORT, GET_WEATHER_DATA};
use crate::services::auth_service;
use crate::web::models::{CreateUserRequest, LoginRequest, MaybeUser};
use crate::web::{AppError, AppState};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub location: Option<String>,
}

const DEFAULT_FORECAST_LOCATION: &str = "Huancavelica";

async fn health_check_handler() -> &'static str {
    "OK"
}

/// Failed logins answer 200 with `success: false`.
async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let result = auth_service::login_user(
        &app_state.db_pool,
        &payload.phone,
        &payload.password,
        &app_state.config.jwt_secret,
    )
    .await?;

    let Some(auth) = result else {
        return Ok(Json(json!({ "success": false, "message": "Invalid credentials" })).into_response());
    };

    let auth_cookie = Cookie::build(("token", auth.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    let body = json!({
        "success": true,
        "token": auth.token,
        "user": auth.user,
        "timestamp": Utc::now().to_rfc3339(),
    });
    let mut response = Json(body).into_response();
    if let Ok(value) = auth_cookie.to_string().parse() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

async fn me_handler(Extension(MaybeUser(user)): Extension<MaybeUser>) -> Json<Value> {
    match user {
        Some(user) => Json(json!({ "authenticated": true, "user": user.claims })),
        None => Json(json!({ "authenticated": false })),
    }
}

async fn create_user_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let auth = auth_service::register_user(&app_state.db_pool, payload, &app_state.config.jwt_secret)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) | AppError::InvalidInput(_) => e,
            other => {
                error!(error = %other, "Failed to create user.");
                AppError::InternalServerError("Could not create user".to_string())
            }
        })?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "user": auth.user }))))
}

/// Never fails: a broken users source yields an empty list.
async fn list_users_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<Value>> {
    match app_state.user_directory.list_users().await {
        Ok(users) => Json(users),
        Err(e) => {
            warn!(error = %e, "Failed to list users.");
            Json(Vec::new())
        }
    }
}

/// Forwards to the weather service and returns its answer unchanged.
async fn weather_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
) -> Json<Value> {
    let data = serde_json::to_value(&query).unwrap_or(Value::Null);
    match app_state.weather_client.send(GET_WEATHER_DATA, data).await {
        Ok(response) => Json(response),
        Err(e) => {
            warn!(addr = %app_state.weather_client.addr(), error = %e, "Weather service call failed.");
            Json(json!({ "error": "Weather service unavailable" }))
        }
    }
}

/// Asks the weather service to fetch and persist the forecast.
async fn weather_report_handler(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    match app_state.weather_client.send(GENERATE_WEATHER_REPORT, Value::Null).await {
        Ok(response) => Json(response),
        Err(e) => {
            warn!(addr = %app_state.weather_client.addr(), error = %e, "Weather service call failed.");
            Json(json!({ "error": "Weather service unavailable" }))
        }
    }
}

/// Stored forecast hours from now on.
async fn stored_forecasts_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<Vec<weather_forecast::Model>>, AppError> {
    let location = query.location.as_deref().unwrap_or(DEFAULT_FORECAST_LOCATION);
    let forecasts = db_services::get_forecasts(&app_state.db_pool, location, Utc::now()).await?;
    Ok(Json(forecasts))
}

pub fn create_rest_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check_handler))
        .route("/auth/login", post(login_handler))
        .route("/me", get(me_handler))
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route("/weather", get(weather_handler))
        .route("/weather/current", get(weather_handler))
        .route("/weather/report", post(weather_report_handler))
        .route("/weather/forecasts", get(stored_forecasts_handler))
}

#[cfg(test)]
mod tests {
    use crate::db::entities::user;
    use crate::db::fixtures;
    use crate::web::test_support::{get, json_request, send, state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn empty_db() -> sea_orm::DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(state(empty_db()), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("OK"));
    }

    #[tokio::test]
    async fn failed_login_is_a_soft_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/auth/login",
            json!({ "phone": "904031408", "password": "incorrecta" }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "message": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn login_then_me_sees_the_claims() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .into_connection();
        let app = state(db);
        let request = json_request(
            "POST",
            "/api/auth/login",
            json!({ "phone": "+51904031408", "password": "secreto123" }),
        );
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["user"]["phone"], json!("904031408"));
        let token = body["token"].as_str().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/me")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (_, me) = send(app.clone(), request).await;
        assert_eq!(me["authenticated"], json!(true));
        assert_eq!(me["user"]["sub"], json!("904031408"));
        assert_eq!(me["user"]["user_id"], json!(1));

        let (_, anonymous) = send(app, get("/api/me")).await;
        assert_eq!(anonymous, json!({ "authenticated": false }));
    }

    #[tokio::test]
    async fn duplicate_user_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/users",
            json!({ "name": "Rosa", "phone": "904031408", "password": "secreto123" }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], json!("A user with that email or phone already exists"));
    }

    #[tokio::test]
    async fn created_user_is_returned_with_201() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![fixtures::user(4, "904031408")]])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/users",
            json!({ "name": "Rosa Quispe", "phone": "+51904031408", "password": "secreto123" }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["user"]["id"], json!(4));
    }

    #[tokio::test]
    async fn user_listing_degrades_to_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([sea_orm::DbErr::Custom("down".to_string())])
            .into_connection();
        let (status, body) = send(state(db), get("/api/users")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn stored_forecasts_filter_by_location() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<crate::db::entities::weather_forecast::Model>::new()])
            .into_connection();
        let app = state(db);
        let (status, body) = send(app.clone(), get("/api/weather/forecasts?location=Acobamba")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let log = crate::web::test_support::transaction_log(app).await;
        let statement = &log[0].statements()[0];
        assert!(statement.sql.contains(r#"ORDER BY "weather_forecasts"."forecast_time" ASC"#));
        let values = statement.values.as_ref().unwrap();
        assert_eq!(values.0[0], sea_orm::Value::from("Acobamba"));
    }

    #[tokio::test]
    async fn unreachable_weather_service_yields_sentinel() {
        let mut config = crate::server::config::ServerConfig::for_tests();
        config.weather_service_addr = "127.0.0.1:1".to_string();
        config.rpc_timeout_ms = 500;
        let app = std::sync::Arc::new(
            crate::web::AppState::new(empty_db(), std::sync::Arc::new(config)).unwrap(),
        );
        let (status, body) = send(app.clone(), get("/api/weather/current")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "error": "Weather service unavailable" }));

        let request = Request::builder()
            .method("POST")
            .uri("/api/weather/report")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(app, request).await;
        assert_eq!(body, json!({ "error": "Weather service unavailable" }));
    }
}
