use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::entities::alert;
use crate::db::enums::{AlertType, ChannelKind, Severity};
use crate::server::config::ServerConfig;

/// Delivery target of one alert channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChannelConfig {
    Telegram {
        bot_token: String,
        chat_id: String,
    },
    /// Mail goes out through the n8n automation webhook.
    Gmail {
        webhook_url: String,
        secret: Option<String>,
    },
    Sms {
        recipient: String,
    },
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelConfig::Telegram { .. } => ChannelKind::Telegram,
            ChannelConfig::Gmail { .. } => ChannelKind::Gmail,
            ChannelConfig::Sms { .. } => ChannelKind::Sms,
        }
    }

    /// What is stored as the recipient of the delivery row.
    pub fn recipient(&self) -> &str {
        match self {
            ChannelConfig::Telegram { chat_id, .. } => chat_id,
            ChannelConfig::Gmail { webhook_url, .. } => webhook_url,
            ChannelConfig::Sms { recipient } => recipient,
        }
    }

    /// Channels enabled by the configuration. Channels with missing settings
    /// are left out.
    pub fn from_server_config(config: &ServerConfig) -> Vec<ChannelConfig> {
        let mut channels = Vec::new();
        if let (Some(bot_token), Some(chat_id)) = (&config.telegram_bot_token, &config.telegram_chat_id) {
            channels.push(ChannelConfig::Telegram {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
            });
        }
        if let Some(webhook_url) = &config.n8n_webhook_url {
            channels.push(ChannelConfig::Gmail {
                webhook_url: webhook_url.clone(),
                secret: config.n8n_webhook_secret.clone(),
            });
        }
        if let Some(recipient) = &config.sms_recipient {
            channels.push(ChannelConfig::Sms {
                recipient: recipient.clone(),
            });
        }
        channels
    }
}

/// Content of an alert as handed to the senders.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub alert_id: i32,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub zone: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Mail addresses, used by the mail channel only.
    pub recipients: Vec<String>,
}

impl AlertMessage {
    pub fn from_alert(alert: &alert::Model, recipients: Vec<String>) -> Self {
        Self {
            alert_id: alert.id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            title: alert.title.clone(),
            description: alert.description.clone(),
            zone: alert.zone.clone(),
            occurred_at: alert.occurred_at,
            recipients,
        }
    }

    /// Plain-text rendering shared by the text channels.
    pub fn text(&self) -> String {
        let zone = self.zone.as_deref().unwrap_or("Huancavelica");
        format!(
            "{}\n{}\nZona: {}\nSeveridad: {}",
            self.title,
            self.description,
            zone,
            self.severity.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    fn config() -> ServerConfig {
        ServerConfig {
            database_url: "postgres://localhost/alerts".to_string(),
            jwt_secret: "secret".to_string(),
            http_addr: "127.0.0.1:0".to_string(),
            weather_service_addr: "127.0.0.1:3003".to_string(),
            rpc_timeout_ms: 1000,
            users_service_url: None,
            log_dir: "logs".to_string(),
            default_zone: "Huancavelica Centro".to_string(),
            expiry_sweep_secs: 300,
            climate_watch_secs: 0,
            telegram_bot_token: Some("123:abc".to_string()),
            telegram_chat_id: None,
            n8n_webhook_url: Some("http://localhost:5678/webhook/clima-alerta".to_string()),
            n8n_webhook_secret: None,
            sms_recipient: Some("+51904031408".to_string()),
        }
    }

    #[test]
    fn incomplete_channels_are_skipped() {
        let kinds: Vec<ChannelKind> = ChannelConfig::from_server_config(&config())
            .iter()
            .map(ChannelConfig::kind)
            .collect();
        assert_eq!(kinds, vec![ChannelKind::Gmail, ChannelKind::Sms]);
    }

    #[test]
    fn message_text_names_zone_and_severity() {
        let message = AlertMessage::from_alert(&fixtures::alert(1), Vec::new());
        assert_eq!(
            message.text(),
            "Alerta de Helada\nTemperatura de -3.0°C detectada\nZona: Acobamba\nSeveridad: alta"
        );
    }
}
