use async_trait::async_trait;
use tracing::warn;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{AlertMessage, ChannelConfig};

/// SMS delivery without a provider: the message is logged and the delivery
/// is reported as failed.
#[derive(Default)]
pub struct SmsSender;

#[async_trait]
impl NotificationSender for SmsSender {
    async fn send(&self, config: &ChannelConfig, message: &AlertMessage) -> Result<(), SenderError> {
        let ChannelConfig::Sms { recipient } = config else {
            return Err(SenderError::InvalidConfiguration(
                "Expected SMS config, but found a different type.".to_string(),
            ));
        };
        warn!(
            alert_id = message.alert_id,
            recipient = %recipient,
            text = %message.text(),
            "SMS provider not configured, message not sent."
        );
        Err(SenderError::SendFailed("sms provider not configured".to_string()))
    }
}

/// Logs a recovery code that would have been sent by SMS.
pub fn log_verification_code(phone: &str, code: &str) {
    warn!(phone, code, "SMS provider not configured, verification code not sent.");
}
