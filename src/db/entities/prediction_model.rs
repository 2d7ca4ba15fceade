use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::ModelType;

/// A trained regression model. `coefficients` holds one weight per feature
/// followed by the intercept.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prediction_models")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub model_type: ModelType,
    #[sea_orm(column_type = "JsonBinary")]
    pub features: Json,
    pub target: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub coefficients: Json,
    /// R² of the fit, clamped to 0..=1.
    pub accuracy: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: Json,
    pub training_rows: i32,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Feature names. Malformed entries are skipped.
    pub fn feature_names(&self) -> Vec<String> {
        self.features
            .as_array()
            .map(|names| names.iter().filter_map(|n| n.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn coefficient_values(&self) -> Vec<f64> {
        self.coefficients
            .as_array()
            .map(|values| values.iter().filter_map(serde_json::Value::as_f64).collect())
            .unwrap_or_default()
    }
}
