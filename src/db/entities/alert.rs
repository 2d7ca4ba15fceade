use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::{AlertStatus, AlertType, Priority, Severity};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub priority: Priority,
    pub status: AlertStatus,
    pub is_active: bool,
    /// When the condition was observed (`fecha` on the wire).
    pub occurred_at: ChronoDateTimeUtc,
    pub location: Option<String>,
    /// Zone name; matches `zones.name` when the zone is known.
    pub zone: Option<String>,
    pub reported_by: Option<String>,
    pub user_id: Option<i32>,
    /// Minutes until the alert was handled.
    pub response_time: Option<i32>,
    pub expires_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::alert_channel::Entity")]
    AlertChannels,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::alert_channel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AlertChannels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
