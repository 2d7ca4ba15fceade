use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use serde_json::json;

use crate::db::entities::prediction_model;
use crate::db::enums::ModelType;
use crate::prediction::TrainedModel;

/// Fields of a newly trained model.
#[derive(Debug, Clone)]
pub struct NewPredictionModel {
    pub name: String,
    pub model_type: ModelType,
    pub features: Vec<String>,
    pub target: String,
    pub trained: TrainedModel,
}

pub async fn create_prediction_model(
    db: &DatabaseConnection,
    new_model: NewPredictionModel,
) -> Result<prediction_model::Model, DbErr> {
    let now = Utc::now();
    let accuracy = new_model.trained.accuracy();
    let metrics = new_model.trained.metrics;
    let training_rows = i32::try_from(new_model.trained.rows).unwrap_or(i32::MAX);
    let model = prediction_model::ActiveModel {
        name: Set(new_model.name),
        model_type: Set(new_model.model_type),
        features: Set(json!(new_model.features)),
        target: Set(new_model.target),
        coefficients: Set(json!(new_model.trained.coefficients)),
        accuracy: Set(accuracy),
        metrics: Set(json!({ "mse": metrics.mse, "rmse": metrics.rmse, "r2": metrics.r2 })),
        training_rows: Set(training_rows),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await
}

/// All models, newest first.
pub async fn get_prediction_models(db: &DatabaseConnection) -> Result<Vec<prediction_model::Model>, DbErr> {
    prediction_model::Entity::find()
        .order_by_desc(prediction_model::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_prediction_model_by_id(
    db: &DatabaseConnection,
    model_id: i32,
) -> Result<Option<prediction_model::Model>, DbErr> {
    prediction_model::Entity::find_by_id(model_id).one(db).await
}

/// Returns `false` when no model had that id.
pub async fn delete_prediction_model(db: &DatabaseConnection, model_id: i32) -> Result<bool, DbErr> {
    let result = prediction_model::Entity::delete_by_id(model_id).exec(db).await?;
    Ok(result.rows_affected > 0)
}
