use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::db::entities::prediction_model;
use crate::db::enums::ModelType;
use crate::db::services::{self as db_services, NewPredictionModel};
use crate::prediction::{RegressionError, TrainedModel, evaluate, fit_linear, fit_multivariate};
use crate::rpc::GET_WEATHER_DATA;
use crate::weather::{ServiceResponse, WeatherReading, WeatherReport};
use crate::web::AppState;
use crate::web::error::AppError;
use crate::web::models::{
    AnalysisView, Location, ModelInfoView, PredictRequest, PredictWithWeatherRequest, PredictionView,
    TrainModelRequest, iso,
};

/// Share of a prediction attributed to weather when weather data was used.
const WEATHER_INFLUENCE: f64 = 0.3;

/// JSON numbers, or strings that parse as finite numbers.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Feature rows and targets from raw records. Records with a missing or
/// non-numeric feature or target are dropped.
pub fn training_rows(
    data: &[Map<String, Value>],
    features: &[String],
    target: &str,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    data.iter()
        .filter_map(|record| {
            let row = features
                .iter()
                .map(|f| record.get(f).and_then(numeric))
                .collect::<Option<Vec<f64>>>()?;
            let y = record.get(target).and_then(numeric)?;
            Some((row, y))
        })
        .unzip()
}

pub fn fit(model_type: ModelType, rows: &[Vec<f64>], ys: &[f64]) -> Result<TrainedModel, RegressionError> {
    match model_type {
        ModelType::Linear => {
            let width = rows.first().map_or(0, Vec::len);
            if width != 1 {
                return Err(RegressionError::FeatureCount(width));
            }
            let xs: Vec<f64> = rows.iter().map(|r| r[0]).collect();
            fit_linear(&xs, ys)
        }
        ModelType::Multivariate => fit_multivariate(rows, ys),
    }
}

pub async fn train_model(db: &DatabaseConnection, request: TrainModelRequest) -> Result<ModelInfoView, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Model name is required.".to_string()));
    }
    if request.target.trim().is_empty() || request.features.is_empty() {
        return Err(AppError::InvalidInput("Features and target are required.".to_string()));
    }
    if request.model_type == ModelType::Linear && request.features.len() != 1 {
        return Err(AppError::InvalidInput(
            RegressionError::FeatureCount(request.features.len()).to_string(),
        ));
    }

    let (rows, ys) = training_rows(&request.data, &request.features, &request.target);
    let skipped = request.data.len() - rows.len();
    let trained = fit(request.model_type, &rows, &ys).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    info!(
        name = %request.name,
        rows = trained.rows,
        skipped,
        r2 = trained.metrics.r2,
        "Prediction model trained."
    );

    let stored = db_services::create_prediction_model(
        db,
        NewPredictionModel {
            name: request.name,
            model_type: request.model_type,
            features: request.features,
            target: request.target,
            trained,
        },
    )
    .await?;
    Ok(ModelInfoView::from(&stored))
}

fn uses_weather(model: &prediction_model::Model) -> bool {
    model.feature_names().iter().any(|f| {
        let f = f.to_lowercase();
        f.contains("weather") || f.contains("clima")
    })
}

/// Applies a stored model to `inputs`. Multivariate models whose features
/// mention weather get temperature, humidity, precipitation and wind speed
/// appended. Linear models take exactly one value.
pub fn apply_model(
    model: &prediction_model::Model,
    mut inputs: Vec<f64>,
    weather: Option<&WeatherReading>,
) -> Result<PredictionView, RegressionError> {
    match model.model_type {
        ModelType::Linear if inputs.len() != 1 => {
            return Err(RegressionError::InputLength { expected: 1, got: inputs.len() });
        }
        ModelType::Linear => {}
        ModelType::Multivariate => {
            if let Some(w) = weather.filter(|_| uses_weather(model)) {
                inputs.extend([w.temperature, w.humidity, w.precipitation, w.wind_speed]);
            }
        }
    }

    Ok(PredictionView {
        prediction: evaluate(&model.coefficient_values(), &inputs),
        confidence: model.accuracy,
        model_used: model.name.clone(),
        input_data: inputs,
        timestamp: iso(Utc::now()),
        weather_influence: weather.map(|_| WEATHER_INFLUENCE),
    })
}

/// Values in the model's feature order. Lists are taken as given, objects are
/// looked up by feature name. Missing or non-numeric values count as zero.
pub fn inputs_for(model: &prediction_model::Model, input: &Value) -> Result<Vec<f64>, AppError> {
    match input {
        Value::Array(values) => Ok(values.iter().map(|v| numeric(v).unwrap_or(0.0)).collect()),
        Value::Object(fields) => Ok(model
            .feature_names()
            .iter()
            .map(|f| fields.get(f).and_then(numeric).unwrap_or(0.0))
            .collect()),
        _ => Err(AppError::InvalidInput(
            "inputData must be a list or an object keyed by feature.".to_string(),
        )),
    }
}

pub async fn get_model(db: &DatabaseConnection, model_id: i32) -> Result<prediction_model::Model, AppError> {
    db_services::get_prediction_model_by_id(db, model_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Model {model_id} not found")))
}

pub async fn list_models(db: &DatabaseConnection) -> Result<Vec<ModelInfoView>, AppError> {
    let models = db_services::get_prediction_models(db).await?;
    Ok(models.iter().map(ModelInfoView::from).collect())
}

pub async fn delete_model(db: &DatabaseConnection, model_id: i32) -> Result<bool, AppError> {
    let deleted = db_services::delete_prediction_model(db, model_id).await?;
    if deleted {
        info!(model_id, "Prediction model deleted.");
    }
    Ok(deleted)
}

/// Current conditions from the weather service. Failures degrade to `None`.
async fn current_weather(state: &AppState, location: Option<Location>) -> Option<WeatherReading> {
    let data = location.map_or(Value::Null, |l| json!({ "lat": l.lat, "lon": l.lon }));
    let response = match state.weather_client.send(GET_WEATHER_DATA, data).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Weather lookup for prediction failed.");
            return None;
        }
    };
    match serde_json::from_value::<ServiceResponse<WeatherReport>>(response) {
        Ok(ServiceResponse { success: true, data: Some(report), .. }) => Some(report.current),
        Ok(other) => {
            warn!(message = %other.message, "Weather service returned no data for prediction.");
            None
        }
        Err(e) => {
            warn!(error = %e, "Unexpected weather payload.");
            None
        }
    }
}

pub async fn predict(state: &AppState, request: PredictRequest) -> Result<PredictionView, AppError> {
    let model = get_model(&state.db_pool, request.model_id).await?;
    let weather = if request.include_weather {
        current_weather(state, request.location).await
    } else {
        None
    };
    apply_model(&model, request.input_data, weather.as_ref()).map_err(|e| AppError::InvalidInput(e.to_string()))
}

pub async fn predict_with_weather(
    db: &DatabaseConnection,
    request: PredictWithWeatherRequest,
) -> Result<PredictionView, AppError> {
    let model = get_model(db, request.model_id).await?;
    let inputs = inputs_for(&model, &request.input_data)?;
    apply_model(&model, inputs, request.weather_data.as_ref()).map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Runs every active model over the same named inputs. Models that cannot
/// take the input are skipped.
pub async fn analyze(
    db: &DatabaseConnection,
    input: &Map<String, Value>,
    weather: Option<&WeatherReading>,
) -> Result<AnalysisView, AppError> {
    let input = Value::Object(input.clone());
    let models = db_services::get_prediction_models(db).await?;

    let mut predictions = Vec::new();
    for model in models.iter().filter(|m| m.is_active) {
        let inputs = inputs_for(model, &input)?;
        match apply_model(model, inputs, weather) {
            Ok(prediction) => predictions.push(prediction),
            Err(e) => warn!(model_id = model.id, error = %e, "Model skipped in analysis."),
        }
    }

    let mean = |values: Vec<f64>| {
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    };
    Ok(AnalysisView {
        average_prediction: mean(predictions.iter().map(|p| p.prediction).collect()),
        average_confidence: mean(predictions.iter().map(|p| p.confidence).collect()),
        predictions,
        timestamp: iso(Utc::now()),
    })
}
