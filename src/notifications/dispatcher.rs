use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::models::{AlertMessage, ChannelConfig};
use super::senders::{
    NotificationSender, sms::SmsSender, telegram::TelegramSender, webhook::WebhookSender,
};
use crate::db::entities::{alert, alert_channel};
use crate::db::enums::ChannelKind;
use crate::db::services as db_services;

/// Fans a new alert out to every configured channel, keeping one
/// `alert_channels` row per attempt.
pub struct AlertDispatcher {
    db: Arc<DatabaseConnection>,
    channels: Vec<ChannelConfig>,
    telegram: Arc<dyn NotificationSender>,
    webhook: Arc<dyn NotificationSender>,
    sms: Arc<dyn NotificationSender>,
}

impl AlertDispatcher {
    pub fn new(db: Arc<DatabaseConnection>, channels: Vec<ChannelConfig>) -> Self {
        Self {
            db,
            channels,
            telegram: Arc::new(TelegramSender::new()),
            webhook: Arc::new(WebhookSender::new()),
            sms: Arc::new(SmsSender),
        }
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    fn sender_for(&self, kind: ChannelKind) -> &dyn NotificationSender {
        match kind {
            ChannelKind::Telegram => self.telegram.as_ref(),
            ChannelKind::Gmail => self.webhook.as_ref(),
            ChannelKind::Sms => self.sms.as_ref(),
        }
    }

    /// Runs [`AlertDispatcher::dispatch`] on a background task.
    pub fn spawn_dispatch(self: &Arc<Self>, alert: alert::Model) {
        if self.channels.is_empty() {
            return;
        }
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let deliveries = dispatcher.dispatch(&alert).await;
            info!(alert_id = alert.id, deliveries = deliveries.len(), "Alert fan-out finished.");
        });
    }

    /// Attempts delivery on each channel and returns the final delivery rows.
    /// Failures are recorded on the rows, never returned.
    pub async fn dispatch(&self, alert: &alert::Model) -> Vec<alert_channel::Model> {
        let needs_mail = self.channels.iter().any(|c| c.kind() == ChannelKind::Gmail);
        let recipients = if needs_mail {
            db_services::get_alert_recipient_emails(&self.db)
                .await
                .unwrap_or_else(|e| {
                    warn!(alert_id = alert.id, error = %e, "Failed to load mail recipients.");
                    Vec::new()
                })
        } else {
            Vec::new()
        };
        let message = AlertMessage::from_alert(alert, recipients);

        let mut deliveries = Vec::with_capacity(self.channels.len());
        for config in &self.channels {
            let kind = config.kind();
            let pending = match db_services::create_pending_delivery(&self.db, alert.id, kind, config.recipient()).await {
                Ok(row) => row,
                Err(e) => {
                    error!(alert_id = alert.id, channel = %kind, error = %e, "Failed to record delivery.");
                    continue;
                }
            };

            let outcome = self
                .sender_for(kind)
                .send(config, &message)
                .await
                .map_err(|e| e.to_string());
            if let Err(reason) = &outcome {
                warn!(alert_id = alert.id, channel = %kind, error = %reason, "Alert delivery failed.");
            }

            match db_services::finish_delivery(&self.db, pending, outcome).await {
                Ok(row) => deliveries.push(row),
                Err(e) => error!(alert_id = alert.id, channel = %kind, error = %e, "Failed to update delivery."),
            }
        }
        deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::DeliveryStatus;
    use crate::db::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn delivery(status: DeliveryStatus, error_message: Option<&str>) -> alert_channel::Model {
        alert_channel::Model {
            id: 1,
            alert_id: 1,
            channel: ChannelKind::Sms,
            recipient: "+51904031408".to_string(),
            status,
            sent_at: None,
            error_message: error_message.map(str::to_string),
            created_at: fixtures::fixed_time(),
        }
    }

    #[tokio::test]
    async fn sms_delivery_is_recorded_as_failed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![delivery(DeliveryStatus::Pending, None)]])
            .append_query_results([vec![delivery(
                DeliveryStatus::Failed,
                Some("Failed to send notification: sms provider not configured"),
            )]])
            .into_connection();
        let dispatcher = AlertDispatcher::new(
            Arc::new(db),
            vec![ChannelConfig::Sms {
                recipient: "+51904031408".to_string(),
            }],
        );

        let rows = dispatcher.dispatch(&fixtures::alert(1)).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DeliveryStatus::Failed);
        assert!(rows[0].error_message.as_deref().unwrap().contains("sms provider not configured"));
    }

    #[tokio::test]
    async fn no_channels_means_no_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let dispatcher = AlertDispatcher::new(Arc::new(db), Vec::new());
        assert!(dispatcher.dispatch(&fixtures::alert(1)).await.is_empty());
    }
}
