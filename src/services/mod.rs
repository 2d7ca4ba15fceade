//! Resolver-level operations: validation, defaults and the side effects
//! (publishing, counters, fan-out) layered over `db::services`.

pub mod alert_service;
pub mod auth_service;
pub mod notification_service;
pub mod prediction_service;
pub mod recommendations;
pub mod user_directory;
