pub mod db;
pub mod logging;
pub mod notifications;
pub mod prediction;
pub mod pubsub;
pub mod rpc;
pub mod server;
pub mod services;
pub mod utils;
pub mod version;
pub mod weather;
pub mod web;
