use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Adverse condition an alert reports. Stored and serialized with the
/// Spanish vocabulary the clients and the database already use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "alert_type_enum")]
pub enum AlertType {
    #[sea_orm(string_value = "lluvia")]
    #[serde(rename = "lluvia")]
    Rain,
    #[sea_orm(string_value = "temperatura")]
    #[serde(rename = "temperatura")]
    Temperature,
    #[sea_orm(string_value = "helada")]
    #[serde(rename = "helada")]
    Frost,
    #[sea_orm(string_value = "sequia")]
    #[serde(rename = "sequia")]
    Drought,
    #[sea_orm(string_value = "viento")]
    #[serde(rename = "viento")]
    Wind,
    #[sea_orm(string_value = "granizada")]
    #[serde(rename = "granizada")]
    Hail,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Rain => "lluvia",
            AlertType::Temperature => "temperatura",
            AlertType::Frost => "helada",
            AlertType::Drought => "sequia",
            AlertType::Wind => "viento",
            AlertType::Hail => "granizada",
        }
    }

    /// Case-insensitive lookup of the wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "lluvia" => Some(AlertType::Rain),
            "temperatura" => Some(AlertType::Temperature),
            "helada" => Some(AlertType::Frost),
            "sequia" => Some(AlertType::Drought),
            "viento" => Some(AlertType::Wind),
            "granizada" => Some(AlertType::Hail),
            _ => None,
        }
    }

    /// Default severity for alerts raised automatically from weather data.
    pub fn default_severity(&self) -> Severity {
        match self {
            AlertType::Frost | AlertType::Hail => Severity::High,
            AlertType::Rain | AlertType::Drought => Severity::Medium,
            AlertType::Wind | AlertType::Temperature => Severity::Low,
        }
    }

    /// Hours an alert of this type stays relevant. Frost passes quickly.
    pub fn expiry_hours(&self) -> i64 {
        match self {
            AlertType::Frost => 12,
            _ => 24,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "severity_enum")]
pub enum Severity {
    #[sea_orm(string_value = "baja")]
    #[serde(rename = "baja")]
    Low,
    #[sea_orm(string_value = "media")]
    #[serde(rename = "media")]
    Medium,
    #[sea_orm(string_value = "alta")]
    #[serde(rename = "alta")]
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "baja",
            Severity::Medium => "media",
            Severity::High => "alta",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

/// Priorities share the severity scale (`baja`/`media`/`alta`).
pub type Priority = Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "alert_status_enum")]
pub enum AlertStatus {
    #[sea_orm(string_value = "activa")]
    #[serde(rename = "activa")]
    Active,
    #[sea_orm(string_value = "enviada")]
    #[serde(rename = "enviada")]
    Sent,
    #[sea_orm(string_value = "cancelada")]
    #[serde(rename = "cancelada")]
    Cancelled,
    #[sea_orm(string_value = "expirada")]
    #[serde(rename = "expirada")]
    Expired,
    #[sea_orm(string_value = "resuelta")]
    #[serde(rename = "resuelta")]
    Resolved,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Delivery mechanism for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "channel_kind_enum")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    #[sea_orm(string_value = "telegram")]
    Telegram,
    #[sea_orm(string_value = "gmail")]
    Gmail,
    #[sea_orm(string_value = "sms")]
    Sms,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Gmail => "gmail",
            ChannelKind::Sms => "sms",
        };
        f.write_str(name)
    }
}

/// State of one alert delivery. `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "delivery_status_enum")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sea_orm(string_value = "enviado")]
    #[serde(rename = "enviado")]
    Sent,
    #[sea_orm(string_value = "fallido")]
    #[serde(rename = "fallido")]
    Failed,
    #[sea_orm(string_value = "entregado")]
    #[serde(rename = "entregado")]
    Delivered,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "recovery_method_enum")]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMethod {
    #[sea_orm(string_value = "sms")]
    Sms,
    #[sea_orm(string_value = "email")]
    Email,
}

/// Regression family of a prediction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "model_type_enum")]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// One feature, closed-form least squares.
    #[sea_orm(string_value = "linear")]
    Linear,
    /// Any number of features, solved through the normal equations.
    #[sea_orm(string_value = "multivariate")]
    Multivariate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_type_uses_spanish_wire_names() {
        assert_eq!(serde_json::to_string(&AlertType::Frost).unwrap(), "\"helada\"");
        let parsed: AlertType = serde_json::from_str("\"sequia\"").unwrap();
        assert_eq!(parsed, AlertType::Drought);
        assert_eq!(AlertType::parse("  HELADA "), Some(AlertType::Frost));
        assert_eq!(AlertType::parse("tornado"), None);
    }

    #[test]
    fn frost_and_hail_are_high_severity() {
        assert_eq!(AlertType::Frost.default_severity(), Severity::High);
        assert_eq!(AlertType::Hail.default_severity(), Severity::High);
        assert_eq!(AlertType::Rain.default_severity(), Severity::Medium);
        assert_eq!(AlertType::Wind.default_severity(), Severity::Low);
    }

    #[test]
    fn frost_expires_sooner() {
        assert_eq!(AlertType::Frost.expiry_hours(), 12);
        assert_eq!(AlertType::Rain.expiry_hours(), 24);
    }

    #[test]
    fn delivery_terminal_states() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::Sent.is_terminal());
    }

    #[test]
    fn status_and_channel_serialization() {
        assert_eq!(serde_json::to_string(&AlertStatus::Resolved).unwrap(), "\"resuelta\"");
        assert_eq!(serde_json::to_string(&ChannelKind::Gmail).unwrap(), "\"gmail\"");
        assert_eq!(serde_json::to_string(&Severity::default()).unwrap(), "\"media\"");
        assert_eq!(serde_json::to_string(&ModelType::Multivariate).unwrap(), "\"multivariate\"");
    }
}
