use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use std::sync::Arc;

use crate::services::auth_service;
use crate::web::models::{
    AuthPayload, CreateUserRequest, LoginRequest, RecoverPasswordRequest, ResetPasswordRequest,
    VerifyCodeRequest,
};
use crate::web::{AppError, AppState};

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<AuthPayload>), AppError> {
    let auth = auth_service::register_user(&app_state.db_pool, payload, &app_state.config.jwt_secret).await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

/// `{token, user}`, or `null` for bad credentials.
async fn token_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Option<AuthPayload>>, AppError> {
    let auth = auth_service::login_user(
        &app_state.db_pool,
        &payload.phone,
        &payload.password,
        &app_state.config.jwt_secret,
    )
    .await?;
    Ok(Json(auth))
}

async fn recover_password_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RecoverPasswordRequest>,
) -> Json<bool> {
    Json(auth_service::recover_password(&app_state.db_pool, &payload.identifier, payload.method).await)
}

async fn verify_code_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Json<bool> {
    Json(auth_service::verify_code(&app_state.db_pool, &payload.phone, &payload.code).await)
}

async fn reset_password_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Json<bool> {
    Json(
        auth_service::reset_password(
            &app_state.db_pool,
            &payload.phone,
            &payload.code,
            &payload.new_password,
        )
        .await,
    )
}

pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/token", post(token_handler))
        .route("/auth/recover-password", post(recover_password_handler))
        .route("/auth/verify-code", post(verify_code_handler))
        .route("/auth/reset-password", post(reset_password_handler))
}

#[cfg(test)]
mod tests {
    use crate::db::entities::user;
    use crate::db::fixtures;
    use crate::web::test_support::{json_request, send, state};
    use axum::http::StatusCode;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    #[tokio::test]
    async fn token_is_null_for_unknown_phone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/auth/token",
            json!({ "phone": "911111111", "password": "secreto123" }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(null));
    }

    #[tokio::test]
    async fn register_returns_token_and_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![fixtures::user(2, "904031408")]])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/auth/register",
            json!({ "name": "Rosa Quispe", "phone": "904031408", "password": "secreto123" }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"]["id"], json!(2));
    }

    #[tokio::test]
    async fn recovery_for_unknown_identifier_is_false() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/auth/recover-password",
            json!({ "identifier": "nadie@example.com", "method": "email" }),
        );
        let (_, body) = send(state(db), request).await;
        assert_eq!(body, json!(false));
    }

    #[tokio::test]
    async fn reset_without_a_valid_code_is_false() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let request = json_request(
            "POST",
            "/api/auth/reset-password",
            json!({ "phone": "904031408", "code": "000000", "newPassword": "tomada" }),
        );
        let (status, body) = send(state(db), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(false));
    }

    #[tokio::test]
    async fn reset_requires_the_code_field() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let request = json_request(
            "POST",
            "/api/auth/reset-password",
            json!({ "phone": "904031408", "newPassword": "tomada" }),
        );
        let (status, _) = send(state(db), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
