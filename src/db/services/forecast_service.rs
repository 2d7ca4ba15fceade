use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::db::entities::weather_forecast;
use crate::weather::{ForecastRecord, parse_forecast_time};

/// Where a batch of forecast hours applies.
#[derive(Debug, Clone)]
pub struct ForecastLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Inserts one row per record with a parseable time. Returns the number of
/// rows written.
pub async fn save_forecasts(
    db: &DatabaseConnection,
    location: &ForecastLocation,
    records: &[ForecastRecord],
) -> Result<u64, DbErr> {
    let now = Utc::now();
    let rows: Vec<weather_forecast::ActiveModel> = records
        .iter()
        .filter_map(|record| {
            let forecast_time = parse_forecast_time(&record.time)?;
            Some(weather_forecast::ActiveModel {
                location_name: Set(location.name.clone()),
                latitude: Set(location.latitude),
                longitude: Set(location.longitude),
                forecast_time: Set(forecast_time),
                temperature_celsius: Set(record.temp_c),
                humidity_percentage: Set(record.humidity),
                precipitation_prob: Set(record.rain_probability),
                precipitation_mm: Set(record.precip_mm),
                wind_speed_kmh: Set(record.wind_kph),
                wind_direction: Set(record.wind_dir.clone()),
                condition: Set(record.condition.clone()),
                created_at: Set(now),
                ..Default::default()
            })
        })
        .collect();
    if rows.is_empty() {
        return Ok(0);
    }
    weather_forecast::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await
}

/// Stored hours for `location_name` from `from` on, earliest first.
pub async fn get_forecasts(
    db: &DatabaseConnection,
    location_name: &str,
    from: DateTime<Utc>,
) -> Result<Vec<weather_forecast::Model>, DbErr> {
    weather_forecast::Entity::find()
        .filter(weather_forecast::Column::LocationName.eq(location_name))
        .filter(weather_forecast::Column::ForecastTime.gte(from))
        .order_by_asc(weather_forecast::Column::ForecastTime)
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn record(time: &str) -> ForecastRecord {
        ForecastRecord {
            time: time.to_string(),
            temp_c: -1.5,
            humidity: 35.0,
            condition: "Despejado".to_string(),
            rain_probability: 0.0,
            precip_mm: 0.0,
            wind_kph: 12.0,
            wind_dir: "SO".to_string(),
            frost_risk: true,
            drought_risk: true,
        }
    }

    fn huancavelica() -> ForecastLocation {
        ForecastLocation {
            name: "Huancavelica".to_string(),
            latitude: -12.7867,
            longitude: -74.9758,
        }
    }

    #[tokio::test]
    async fn unparseable_hours_are_not_stored() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .into_connection();
        let records = [record("2025-06-01 00:00"), record("sin fecha"), record("2025-06-01 01:00")];

        let saved = save_forecasts(&db, &huancavelica(), &records).await.unwrap();
        assert_eq!(saved, 2);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let statement = &log[0].statements()[0];
        assert!(statement.sql.starts_with(r#"INSERT INTO "weather_forecasts""#));
        assert!(!statement.sql.contains("RETURNING"));
        // Twelve columns per row, two rows.
        assert_eq!(statement.values.as_ref().unwrap().0.len(), 24);
    }

    #[tokio::test]
    async fn nothing_to_store_skips_the_insert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let saved = save_forecasts(&db, &huancavelica(), &[record("mañana")]).await.unwrap();
        assert_eq!(saved, 0);
        assert!(db.into_transaction_log().is_empty());
    }
}
