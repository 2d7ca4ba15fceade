use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, prelude::Expr,
};

use crate::db::entities::user;

/// Fields of a new user. `phone` must already be normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub roles: Vec<String>,
}

pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(user_id).one(db).await
}

pub async fn get_user_by_phone(db: &DatabaseConnection, phone: &str) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Phone.eq(phone))
        .one(db)
        .await
}

/// Looks a user up by phone (already normalized) or by email.
pub async fn get_user_by_phone_or_email(
    db: &DatabaseConnection,
    phone: &str,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Phone.eq(phone))
                .add(user::Column::Email.eq(email)),
        )
        .one(db)
        .await
}

/// True if another account already uses `phone` or `email`.
pub async fn user_exists(db: &DatabaseConnection, phone: &str, email: Option<&str>) -> Result<bool, DbErr> {
    let mut condition = Condition::any().add(user::Column::Phone.eq(phone));
    if let Some(email) = email {
        condition = condition.add(user::Column::Email.eq(email));
    }
    Ok(user::Entity::find().filter(condition).one(db).await?.is_some())
}

pub async fn get_all_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find().order_by_asc(user::Column::Id).all(db).await
}

/// Emails of active users, used as recipients of alert mail.
pub async fn get_alert_recipient_emails(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
    let users = user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .filter(user::Column::Email.is_not_null())
        .all(db)
        .await?;
    let mut emails: Vec<String> = users
        .into_iter()
        .filter_map(|u| u.email)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    emails.sort();
    emails.dedup();
    Ok(emails)
}

pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model, DbErr> {
    let now = Utc::now();
    let roles = serde_json::to_string(&new_user.roles).map_err(|e| DbErr::Custom(e.to_string()))?;
    let model = user::ActiveModel {
        name: Set(new_user.name),
        phone: Set(new_user.phone),
        email: Set(new_user.email),
        password_hash: Set(new_user.password_hash),
        city: Set(new_user.city),
        zone: Set(new_user.zone),
        roles: Set(roles),
        is_active: Set(true),
        reported_alerts: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await
}

pub async fn increment_reported_alerts(db: &DatabaseConnection, user_id: i32) -> Result<u64, DbErr> {
    let result = user::Entity::update_many()
        .col_expr(
            user::Column::ReportedAlerts,
            Expr::col(user::Column::ReportedAlerts).add(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn update_password_hash(
    db: &DatabaseConnection,
    user: user::Model,
    password_hash: String,
) -> Result<user::Model, DbErr> {
    let mut active = user.into_active_model();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    active.update(db).await
}

/// Decodes the JSON `roles` column, falling back to no roles on bad data.
pub fn user_roles(user: &user::Model) -> Vec<String> {
    serde_json::from_str(&user.roles).unwrap_or_default()
}
