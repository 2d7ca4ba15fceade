use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tracing::{error, info, warn};

use crate::db::entities::user;
use crate::db::enums::RecoveryMethod;
use crate::db::services::{self as db_services, NewUser};
use crate::notifications::senders::sms::log_verification_code;
use crate::utils::{generate_verification_code, normalize_phone};
use crate::web::error::AppError;
use crate::web::models::{AuthPayload, Claims, CreateUserRequest, UserView};

const DEFAULT_ROLE: &str = "agricultor";
const DUPLICATE_USER_MESSAGE: &str = "A user with that email or phone already exists";

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    // Token valid for 24 hours
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.phone.clone(),
        user_id: user.id,
        exp: expiration,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(format!("Failed to sign token: {e}")))
}

pub fn decode_jwt(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding failed.");
        AppError::InvalidCredentials
    })
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Creates an account and signs a token for it.
pub async fn register_user(
    db: &DatabaseConnection,
    req: CreateUserRequest,
    jwt_secret: &str,
) -> Result<AuthPayload, AppError> {
    let phone = normalize_phone(&req.phone);
    if req.name.trim().is_empty() || phone.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Name, phone and password are required.".to_string(),
        ));
    }
    let email = req
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    if db_services::user_exists(db, &phone, email.as_deref()).await? {
        return Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.to_string()));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let roles = req
        .roles
        .filter(|roles| !roles.is_empty())
        .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]);

    let new_user = NewUser {
        name: req.name.trim().to_string(),
        phone,
        email,
        password_hash,
        city: req.city,
        zone: req.zone,
        roles,
    };

    let user = db_services::create_user(db, new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(DUPLICATE_USER_MESSAGE.to_string())
        } else {
            error!(error = %e, "Failed to create user.");
            AppError::InternalServerError("Could not create user".to_string())
        }
    })?;
    info!(user_id = user.id, "User registered.");

    let token = create_jwt_for_user(&user, jwt_secret)?;
    Ok(AuthPayload {
        token,
        user: UserView::from(&user),
    })
}

/// `None` when the phone is unknown or the password does not match.
pub async fn login_user(
    db: &DatabaseConnection,
    phone: &str,
    password: &str,
    jwt_secret: &str,
) -> Result<Option<AuthPayload>, AppError> {
    let phone = normalize_phone(phone);
    if phone.is_empty() || password.is_empty() {
        return Ok(None);
    }

    let Some(user) = db_services::get_user_by_phone(db, &phone).await? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }

    let valid_password = verify(password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        return Ok(None);
    }

    let token = create_jwt_for_user(&user, jwt_secret)?;
    Ok(Some(AuthPayload {
        token,
        user: UserView::from(&user),
    }))
}

/// Issues a recovery code for the user identified by phone or email.
/// Returns `false` when no such user exists or anything fails.
pub async fn recover_password(db: &DatabaseConnection, identifier: &str, method: RecoveryMethod) -> bool {
    match try_recover_password(db, identifier, method).await {
        Ok(sent) => sent,
        Err(e) => {
            error!(error = %e, "Error in recover_password.");
            false
        }
    }
}

async fn try_recover_password(
    db: &DatabaseConnection,
    identifier: &str,
    method: RecoveryMethod,
) -> Result<bool, DbErr> {
    let identifier = identifier.trim();
    let Some(user) =
        db_services::get_user_by_phone_or_email(db, &normalize_phone(identifier), identifier).await?
    else {
        return Ok(false);
    };

    let code = generate_verification_code();
    db_services::create_verification_code(db, user.id, &code, method).await?;

    match method {
        RecoveryMethod::Sms => log_verification_code(&user.phone, &code),
        RecoveryMethod::Email => {
            info!(user_id = user.id, "Verification code created for email recovery.");
        }
    }
    Ok(true)
}

/// Checks a recovery code without consuming it, so the same code can then
/// be handed to [`reset_password`]. `false` if the code is unknown, used or
/// expired.
pub async fn verify_code(db: &DatabaseConnection, phone: &str, code: &str) -> bool {
    let result: Result<bool, DbErr> = async {
        let Some(user) = db_services::get_user_by_phone(db, &normalize_phone(phone)).await? else {
            return Ok(false);
        };
        let found = db_services::find_valid_code(db, user.id, code.trim(), Utc::now()).await?;
        Ok(found.is_some())
    }
    .await;

    result.unwrap_or_else(|e| {
        error!(error = %e, "Error in verify_code.");
        false
    })
}

/// Sets a new password once `code` is claimed, then invalidates every other
/// outstanding recovery code. Without a valid code nothing changes.
pub async fn reset_password(db: &DatabaseConnection, phone: &str, code: &str, new_password: &str) -> bool {
    if new_password.is_empty() || code.trim().is_empty() {
        return false;
    }
    let result: Result<bool, AppError> = async {
        let Some(user) = db_services::get_user_by_phone(db, &normalize_phone(phone)).await? else {
            return Ok(false);
        };
        let user_id = user.id;
        if !db_services::claim_code(db, user_id, code.trim(), Utc::now()).await? {
            warn!(user_id, "Password reset with an invalid recovery code.");
            return Ok(false);
        }
        let password_hash = hash(new_password, DEFAULT_COST)
            .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;
        db_services::update_password_hash(db, user, password_hash).await?;
        db_services::mark_all_codes_used(db, user_id).await?;
        info!(user_id, "Password reset.");
        Ok(true)
    }
    .await;

    result.unwrap_or_else(|e| {
        error!(error = %e, "Error in reset_password.");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::verification_code;
    use crate::db::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    const SECRET: &str = "test-secret";

    fn create_request(phone: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Rosa Quispe".to_string(),
            phone: phone.to_string(),
            email: Some("user1@example.com".to_string()),
            password: "secreto123".to_string(),
            city: None,
            zone: Some("Acobamba".to_string()),
            roles: None,
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let user = fixtures::user(7, "904031408");
        let token = create_jwt_for_user(&user, SECRET).unwrap();
        let claims = decode_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "904031408");
        assert_eq!(claims.user_id, 7);
        assert!(claims.exp > Utc::now().timestamp() as usize);

        assert!(matches!(decode_jwt(&token, "other-secret"), Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn register_rejects_duplicates() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .into_connection();

        let err = register_user(&db, create_request("+51904031408"), SECRET)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == DUPLICATE_USER_MESSAGE));
    }

    #[tokio::test]
    async fn register_returns_token_and_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .into_connection();

        let payload = register_user(&db, create_request("+51 904 031 408"), SECRET)
            .await
            .unwrap();
        assert_eq!(payload.user.phone, "904031408");
        assert_eq!(decode_jwt(&payload.token, SECRET).unwrap().user_id, 1);
    }

    #[tokio::test]
    async fn register_requires_a_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut req = create_request("904031408");
        req.password = String::new();
        assert!(matches!(
            register_user(&db, req, SECRET).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let ok = login_user(&db, "+51904031408", "secreto123", SECRET).await.unwrap();
        assert_eq!(ok.map(|p| p.user.id), Some(1));

        let wrong = login_user(&db, "904031408", "otra", SECRET).await.unwrap();
        assert!(wrong.is_none());

        let unknown = login_user(&db, "911111111", "secreto123", SECRET).await.unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn recover_password_for_unknown_user_is_false() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        assert!(!recover_password(&db, "nadie@example.com", RecoveryMethod::Email).await);
    }

    #[tokio::test]
    async fn recover_password_stores_a_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_query_results([vec![fixtures::verification_code(1, 1, "123456")]])
            .into_connection();
        assert!(recover_password(&db, "+51904031408", RecoveryMethod::Sms).await);
    }

    fn rows(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn verify_code_checks_without_consuming() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_query_results([vec![fixtures::verification_code(1, 1, "123456")]])
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_query_results([Vec::<verification_code::Model>::new()])
            .into_connection();

        assert!(verify_code(&db, "904031408", "123456").await);
        assert!(!verify_code(&db, "904031408", "000000").await);

        let log = db.into_transaction_log();
        assert!(log.iter().all(|t| t.statements().iter().all(|s| !s.sql.starts_with("UPDATE"))));
    }

    #[tokio::test]
    async fn reset_password_claims_the_code_then_rehashes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_exec_results([rows(1), rows(2)])
            .into_connection();

        assert!(reset_password(&db, "904031408", "123456", "nueva-clave").await);

        let log = db.into_transaction_log();
        let sql: Vec<&str> = log
            .iter()
            .flat_map(|t| t.statements())
            .map(|s| s.sql.as_str())
            .collect();
        assert!(sql[1].starts_with(r#"UPDATE "verification_codes" SET "used""#));
        assert!(sql[1].contains(r#""verification_codes"."code" = "#));
        assert!(sql[2].starts_with(r#"UPDATE "users""#));
    }

    #[tokio::test]
    async fn reset_password_without_a_valid_code_changes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![fixtures::user(1, "904031408")]])
            .append_exec_results([rows(0)])
            .into_connection();

        assert!(!reset_password(&db, "904031408", "999999", "tomada").await);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|t| t.statements().iter().all(|s| !s.sql.starts_with(r#"UPDATE "users""#))));
    }

    #[tokio::test]
    async fn reset_password_requires_a_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        assert!(!reset_password(&db, "904031408", "  ", "nueva-clave").await);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn reset_password_for_unknown_phone_is_false() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        assert!(!reset_password(&db, "911111111", "123456", "nueva-clave").await);
    }
}
