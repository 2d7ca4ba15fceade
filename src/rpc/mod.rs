//! Request/response messaging between the gateway and the weather service over
//! plain TCP. Messages are JSON documents framed as `<length>#<json>`, where
//! the length counts UTF-16 code units of the JSON text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod client;
pub mod codec;
pub mod server;

pub use client::WeatherClient;
pub use server::{RpcHandler, serve};

pub const GET_WEATHER_DATA: &str = "get_weather_data";
pub const GET_CLIMATE_ALERTS: &str = "get_climate_alerts";
pub const GENERATE_WEATHER_REPORT: &str = "generate_weather_report";

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupted frame: {0}")]
    Codec(String),
    #[error("Invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No reply within {0} ms")]
    Timeout(u64),
    #[error("Connection closed before a reply was received")]
    ConnectionClosed,
    #[error("There is no matching message handler defined in the remote service.")]
    NoHandler,
    #[error("{0}")]
    Remote(String),
}

/// A request. Messages without an `id` are events and get no reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub pattern: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReply {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<Value>,
    #[serde(default)]
    pub is_disposed: bool,
}

impl RpcRequest {
    /// Pattern as a string. Object patterns are matched by their JSON text.
    pub fn pattern_name(&self) -> String {
        match &self.pattern {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
