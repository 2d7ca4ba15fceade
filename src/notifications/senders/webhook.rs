use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{AlertMessage, ChannelConfig};

const SIGNATURE_HEADER: &str = "x-n8n-signature";

/// Hands alerts to the n8n automation webhook, which mails the recipients.
pub struct WebhookSender {
    client: Client,
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookSender {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebhookPayload {
    tipo: String,
    fecha: String,
    descripcion: String,
    recipients: Vec<String>,
    severity: String,
    /// `<type>|<UTC hour>`, lets the workflow drop repeats within the hour.
    dedupe_key: String,
}

impl WebhookPayload {
    pub(crate) fn from_message(message: &AlertMessage) -> Self {
        let hour = message.occurred_at.format("%Y-%m-%dT%H");
        Self {
            tipo: message.alert_type.to_string(),
            fecha: message.occurred_at.to_rfc3339(),
            descripcion: message.description.clone(),
            recipients: message.recipients.clone(),
            severity: message.severity.as_str().to_string(),
            dedupe_key: format!("{}|{hour}", message.alert_type),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, config: &ChannelConfig, message: &AlertMessage) -> Result<(), SenderError> {
        let ChannelConfig::Gmail { webhook_url, secret } = config else {
            return Err(SenderError::InvalidConfiguration(
                "Expected mail webhook config, but found a different type.".to_string(),
            ));
        };
        if message.recipients.is_empty() {
            return Err(SenderError::SendFailed("no mail recipients".to_string()));
        }

        let mut request = self
            .client
            .post(webhook_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&WebhookPayload::from_message(message));
        if let Some(secret) = secret {
            request = request.header(SIGNATURE_HEADER, secret);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
