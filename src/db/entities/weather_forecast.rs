use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One persisted forecast hour.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weather_forecasts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub forecast_time: ChronoDateTimeUtc,
    pub temperature_celsius: f64,
    pub humidity_percentage: f64,
    pub precipitation_prob: f64,
    pub precipitation_mm: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction: String,
    pub condition: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
