//! Data access for the alert backend. Each sub-module owns the queries for one
//! table; everything is re-exported so callers use `crate::db::services::*`.

pub mod alert_channel_service;
pub mod alert_service;
pub mod forecast_service;
pub mod notification_service;
pub mod prediction_model_service;
pub mod user_service;
pub mod verification_service;
pub mod zone_service;

pub use alert_channel_service::*;
pub use alert_service::*;
pub use forecast_service::*;
pub use notification_service::*;
pub use prediction_model_service::*;
pub use user_service::*;
pub use verification_service::*;
pub use zone_service::*;
