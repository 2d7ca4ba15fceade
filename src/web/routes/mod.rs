pub mod ai_routes;
pub mod alert_routes;
pub mod auth_routes;
pub mod notification_routes;
pub mod rest_routes;
pub mod zone_routes;
