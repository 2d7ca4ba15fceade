use async_trait::async_trait;
use thiserror::Error;

use super::models::{AlertMessage, ChannelConfig};

pub mod sms;
pub mod telegram;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Delivers an alert over one kind of channel.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends `message` using the channel settings in `config`.
    async fn send(&self, config: &ChannelConfig, message: &AlertMessage) -> Result<(), SenderError>;
}
