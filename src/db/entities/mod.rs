//! SeaORM entities, one module per table.

pub mod alert;
pub mod alert_channel;
pub mod notification;
pub mod prediction_model;
pub mod user;
pub mod verification_code;
pub mod weather_forecast;
pub mod zone;

// Prelude module for easy importing of all entities and their related types
pub mod prelude {
    pub use super::alert::Entity as Alert;
    pub use super::alert::Model as AlertModel;
    pub use super::alert::ActiveModel as AlertActiveModel;
    pub use super::alert::Column as AlertColumn;

    pub use super::alert_channel::Entity as AlertChannel;
    pub use super::alert_channel::Model as AlertChannelModel;
    pub use super::alert_channel::ActiveModel as AlertChannelActiveModel;
    pub use super::alert_channel::Column as AlertChannelColumn;

    pub use super::notification::Entity as Notification;
    pub use super::notification::Model as NotificationModel;
    pub use super::notification::ActiveModel as NotificationActiveModel;
    pub use super::notification::Column as NotificationColumn;

    pub use super::prediction_model::Entity as PredictionModel;
    pub use super::prediction_model::Model as PredictionModelModel;
    pub use super::prediction_model::ActiveModel as PredictionModelActiveModel;
    pub use super::prediction_model::Column as PredictionModelColumn;

    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;
    pub use super::user::ActiveModel as UserActiveModel;
    pub use super::user::Column as UserColumn;

    pub use super::verification_code::Entity as VerificationCode;
    pub use super::verification_code::Model as VerificationCodeModel;
    pub use super::verification_code::ActiveModel as VerificationCodeActiveModel;
    pub use super::verification_code::Column as VerificationCodeColumn;

    pub use super::weather_forecast::Entity as WeatherForecast;
    pub use super::weather_forecast::Model as WeatherForecastModel;
    pub use super::weather_forecast::ActiveModel as WeatherForecastActiveModel;
    pub use super::weather_forecast::Column as WeatherForecastColumn;

    pub use super::zone::Entity as Zone;
    pub use super::zone::Model as ZoneModel;
    pub use super::zone::ActiveModel as ZoneActiveModel;
    pub use super::zone::Column as ZoneColumn;
}
