//! Authentication: password hashing, login sessions, and the [Authed] extractor.

mod extractors;
pub mod password;
pub mod sessions;

use axum::http::StatusCode;
pub use extractors::*;
use thiserror::Error;

use crate::{
    errors::HttpError,
    models::user::{UserId, UserRole},
};

/// An error related to authentication
#[derive(Debug, Error)]
pub enum AuthError {
    /// The bearer token was missing, malformed, unknown, or expired
    #[error("Invalid token")]
    InvalidToken,
    /// The password did not match
    #[error("Invalid password")]
    IncorrectPassword,
    /// The password hasher failed to run
    #[error("Password hasher error: {0}")]
    PasswordHasherError(String),
    /// A database error occurred while looking up a session
    #[error("Database error")]
    Db,
}

impl HttpError for AuthError {
    type Detail = ();

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidToken | Self::IncorrectPassword => StatusCode::UNAUTHORIZED,
            Self::PasswordHasherError(_) | Self::Db => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::IncorrectPassword => "invalid_password",
            Self::PasswordHasherError(_) => "auth_subsystem",
            Self::Db => "database",
        }
    }

    fn error_detail(&self) {}
}

/// The user making the request
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthInfo {
    pub user_id: UserId,
    pub user_name: String,
    pub role: UserRole,
}
