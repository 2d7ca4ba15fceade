use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, prelude::Expr,
};

use crate::db::entities::verification_code;
use crate::db::enums::RecoveryMethod;

/// Lifetime of a password recovery code.
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 10;

pub async fn create_verification_code(
    db: &DatabaseConnection,
    user_id: i32,
    code: &str,
    method: RecoveryMethod,
) -> Result<verification_code::Model, DbErr> {
    let now = Utc::now();
    let model = verification_code::ActiveModel {
        code: Set(code.to_string()),
        method: Set(method),
        expires_at: Set(now + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES)),
        used: Set(false),
        user_id: Set(user_id),
        created_at: Set(now),
        ..Default::default()
    };
    model.insert(db).await
}

/// Latest unused code for the user matching `code` that has not expired at `now`.
pub async fn find_valid_code(
    db: &DatabaseConnection,
    user_id: i32,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<verification_code::Model>, DbErr> {
    verification_code::Entity::find()
        .filter(verification_code::Column::UserId.eq(user_id))
        .filter(verification_code::Column::Code.eq(code))
        .filter(verification_code::Column::Used.eq(false))
        .filter(verification_code::Column::ExpiresAt.gt(now))
        .order_by_desc(verification_code::Column::CreatedAt)
        .one(db)
        .await
}

/// Consumes `code` in a single conditional update. Returns `false` when no
/// unused, unexpired code of the user matches, including when another request
/// claimed it first.
pub async fn claim_code(
    db: &DatabaseConnection,
    user_id: i32,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = verification_code::Entity::update_many()
        .col_expr(verification_code::Column::Used, Expr::value(true))
        .filter(verification_code::Column::UserId.eq(user_id))
        .filter(verification_code::Column::Code.eq(code))
        .filter(verification_code::Column::Used.eq(false))
        .filter(verification_code::Column::ExpiresAt.gt(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Invalidates every outstanding code of the user.
pub async fn mark_all_codes_used(db: &DatabaseConnection, user_id: i32) -> Result<u64, DbErr> {
    let result = verification_code::Entity::update_many()
        .col_expr(verification_code::Column::Used, Expr::value(true))
        .filter(verification_code::Column::UserId.eq(user_id))
        .filter(verification_code::Column::Used.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
