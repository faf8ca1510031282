//! Login sessions. A session token is the session ID and a random value, each base64-encoded and
//! joined with a '.'. Only a hash of the full token is stored, so a token can not be
//! reconstructed from the database.

use base64::{display::Base64Display, engine::GeneralPurpose, Engine};
use chrono::{Duration, Utc};
use error_stack::{Report, ResultExt};
use sha3::Digest;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{event, instrument, Level};
use uuid::Uuid;

use super::{AuthError, AuthInfo};
use crate::models::user::UserId;

const B64_ENGINE: GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;
const TOKEN_LENGTH: usize = 45;

/// A newly generated session token
pub struct SessionKey {
    /// The ID of the session
    pub session_id: Uuid,
    /// The hash of the token, which is what gets stored.
    pub hash: Vec<u8>,
    /// The token handed to the client. This is not stored in the database.
    pub token: String,
}

impl SessionKey {
    pub fn new() -> SessionKey {
        let id = Uuid::now_v7();
        let base64_id = Base64Display::new(id.as_bytes(), &B64_ENGINE);
        let random_id = Uuid::new_v4();
        let random = Base64Display::new(random_id.as_bytes(), &B64_ENGINE);
        let token = format!("{base64_id}.{random}");
        let hash = hash_token(&token);

        SessionKey {
            session_id: id,
            hash,
            token,
        }
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = sha3::Sha3_512::default();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Split a token into the session ID and the hash of the whole token.
pub fn decode_token(token: &str) -> Result<(Uuid, Vec<u8>), AuthError> {
    if token.len() != TOKEN_LENGTH {
        return Err(AuthError::InvalidToken);
    }

    let id_portion = token.split_once('.').ok_or(AuthError::InvalidToken)?.0;
    let id_bytes = B64_ENGINE
        .decode(id_portion.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let session_id = Uuid::from_slice(&id_bytes).map_err(|_| AuthError::InvalidToken)?;

    Ok((session_id, hash_token(token)))
}

/// Create a session for the user and return the token for it.
#[instrument(skip(db))]
pub async fn create_session(
    db: impl SqliteExecutor<'_>,
    user_id: UserId,
    expires_in: Duration,
) -> Result<String, Report<AuthError>> {
    let key = SessionKey::new();
    let expires_at = Utc::now() + expires_in;

    sqlx::query("INSERT INTO sessions (id, user_id, hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(key.session_id)
        .bind(user_id)
        .bind(&key.hash)
        .bind(expires_at)
        .execute(db)
        .await
        .change_context(AuthError::Db)?;

    event!(Level::INFO, session_id = %key.session_id, %user_id, "Created session");
    Ok(key.token)
}

/// Find the user for a bearer token. The session must not be expired, and the user must
/// still exist.
#[instrument(skip_all)]
pub async fn lookup_session(db: &SqlitePool, token: &str) -> Result<AuthInfo, Report<AuthError>> {
    let (session_id, hash) = decode_token(token)?;

    sqlx::query_as::<_, AuthInfo>(
        "SELECT users.id AS user_id, users.user_name, users.role
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.id = ? AND sessions.hash = ? AND sessions.expires_at > ?
            AND users.deleted_at IS NULL",
    )
    .bind(session_id)
    .bind(&hash)
    .bind(Utc::now())
    .fetch_optional(db)
    .await
    .change_context(AuthError::Db)?
    .ok_or(AuthError::InvalidToken)
    .attach_printable_lazy(|| format!("No live session {session_id}"))
}

/// Remove sessions that have expired. Returns the number of sessions removed.
#[instrument(skip(db))]
pub async fn delete_expired_sessions(db: impl SqliteExecutor<'_>) -> Result<u64, Report<AuthError>> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now())
        .execute(db)
        .await
        .change_context(AuthError::Db)?;
    Ok(result.rows_affected())
}
