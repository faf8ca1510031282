use chrono::Utc;
use error_stack::{Report, ResultExt};
use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::{event, instrument, Level};

use super::{types::*, UserId};
use crate::{
    auth::{password, sessions, AuthError},
    error::insert_error,
    Error,
};

const USER_COLUMNS: &str = "id, user_name, role, registered_at, updated_at, deleted_at";

/// Look up a live user by name.
#[instrument(skip(db))]
pub async fn get_by_user_name(
    db: impl SqliteExecutor<'_>,
    user_name: &str,
) -> Result<User, Report<Error>> {
    let q = format!("SELECT {USER_COLUMNS} FROM users WHERE user_name = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, User>(&q)
        .bind(user_name)
        .fetch_optional(db)
        .await
        .change_context(Error::Db)?
        .ok_or(Error::UserNotFound)
        .attach_printable_lazy(|| format!("{user_name} not found"))
}

/// Register a new user, hashing the password.
#[instrument(skip(db, payload), fields(user_name = %payload.user_name))]
pub async fn join(
    db: &mut SqliteConnection,
    payload: UserJoinPayload,
) -> Result<User, Report<Error>> {
    let existing = sqlx::query_scalar::<_, UserId>(
        "SELECT id FROM users WHERE user_name = ? AND deleted_at IS NULL",
    )
    .bind(&payload.user_name)
    .fetch_optional(&mut *db)
    .await
    .change_context(Error::Db)?;

    if existing.is_some() {
        return Err(Report::new(Error::DuplicatedUserName)
            .attach_printable(format!("{} is duplicated", payload.user_name)));
    }

    let password_hash = password::new_hash(payload.password)
        .await
        .change_context(Error::AuthSubsystem)?;

    create_raw(
        &mut *db,
        UserId::new(),
        &payload.user_name,
        &password_hash,
        UserRole::User,
    )
    .await
}

/// Insert a user with an already-hashed password. A name that is already taken by a live user
/// fails with [Error::DuplicatedUserName].
#[instrument(skip(db, password_hash))]
pub async fn create_raw(
    db: impl SqliteExecutor<'_>,
    id: UserId,
    user_name: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User, Report<Error>> {
    let now = Utc::now();
    let q = format!(
        "INSERT INTO users (id, user_name, password_hash, role, registered_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {USER_COLUMNS}"
    );

    sqlx::query_as::<_, User>(&q)
        .bind(id)
        .bind(user_name)
        .bind(password_hash)
        .bind(role)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .map_err(|e| {
            let report = insert_error(e, Error::DuplicatedUserName);
            if matches!(report.current_context(), Error::DuplicatedUserName) {
                report.attach_printable(format!("{user_name} is duplicated"))
            } else {
                report
            }
        })
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: UserId,
    password_hash: String,
}

/// Check the user's password and start a new session, returning its token.
#[instrument(skip(db, payload), fields(user_name = %payload.user_name))]
pub async fn login(
    db: &mut SqliteConnection,
    payload: UserLoginPayload,
    session_expiry: chrono::Duration,
) -> Result<UserLoginResponse, Report<Error>> {
    let user = sqlx::query_as::<_, LoginRow>(
        "SELECT id, password_hash FROM users WHERE user_name = ? AND deleted_at IS NULL",
    )
    .bind(&payload.user_name)
    .fetch_optional(&mut *db)
    .await
    .change_context(Error::Db)?
    .ok_or(Error::UserNotFound)
    .attach_printable_lazy(|| format!("{} not found", payload.user_name))?;

    password::verify_password(payload.password, user.password_hash)
        .await
        .map_err(|e| match e {
            AuthError::IncorrectPassword => Report::new(Error::InvalidPassword),
            e => Report::new(e).change_context(Error::AuthSubsystem),
        })?;

    let token = sessions::create_session(&mut *db, user.id, session_expiry)
        .await
        .change_context(Error::AuthSubsystem)?;

    event!(Level::INFO, user_id = %user.id, "User logged in");
    Ok(UserLoginResponse { token })
}
