use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::services::prediction_service;
use crate::web::models::{
    AnalysisView, AnalyzeRequest, ModelInfoView, PredictRequest, PredictWithWeatherRequest, PredictionView,
    TrainModelRequest,
};
use crate::web::{AppError, AppState};

async fn train_model_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TrainModelRequest>,
) -> Result<(StatusCode, Json<ModelInfoView>), AppError> {
    let view = prediction_service::train_model(&app_state.db_pool, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_models_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<Vec<ModelInfoView>>, AppError> {
    Ok(Json(prediction_service::list_models(&app_state.db_pool).await?))
}

async fn get_model_handler(
    State(app_state): State<Arc<AppState>>,
    Path(model_id): Path<i32>,
) -> Result<Json<ModelInfoView>, AppError> {
    let model = prediction_service::get_model(&app_state.db_pool, model_id).await?;
    Ok(Json(ModelInfoView::from(&model)))
}

async fn delete_model_handler(
    State(app_state): State<Arc<AppState>>,
    Path(model_id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let deleted = prediction_service::delete_model(&app_state.db_pool, model_id).await?;
    let message = if deleted {
        "Modelo eliminado exitosamente"
    } else {
        "Modelo no encontrado"
    };
    Ok(Json(json!({ "success": deleted, "message": message })))
}

async fn predict_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<PredictRequest>,
) -> Result<Json<PredictionView>, AppError> {
    Ok(Json(prediction_service::predict(&app_state, payload).await?))
}

async fn predict_with_weather_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<PredictWithWeatherRequest>,
) -> Result<Json<PredictionView>, AppError> {
    Ok(Json(prediction_service::predict_with_weather(&app_state.db_pool, payload).await?))
}

async fn analyze_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisView>, AppError> {
    let analysis =
        prediction_service::analyze(&app_state.db_pool, &payload.input_data, payload.weather_data.as_ref()).await?;
    Ok(Json(analysis))
}

async fn ai_health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

pub fn create_ai_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(ai_health_handler))
        .route("/train-model", post(train_model_handler))
        .route("/models", get(list_models_handler))
        .route("/models/{id}", get(get_model_handler).delete(delete_model_handler))
        .route("/predict", post(predict_handler))
        .route("/predict-with-weather", post(predict_with_weather_handler))
        .route("/analyze-complete", post(analyze_handler))
}
