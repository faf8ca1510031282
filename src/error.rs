use axum::http::StatusCode;
use error_stack::Report;
use thiserror::Error;

use crate::errors::HttpError;

/// The top-level error type for the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to start the HTTP server
    #[error("Failed to start server")]
    ServerStart,
    /// Failure while shutting down
    #[error("Encountered error while shutting down")]
    Shutdown,
    /// A failure reading or writing the database
    #[error("Database error")]
    Db,
    /// The query string contained an unusable filter or ordering
    #[error("Invalid filter")]
    Filter,
    /// Password hashing or session handling failed
    #[error("Authentication subsystem error")]
    AuthSubsystem,
    /// A user tried to register with a name that is already taken
    #[error("User name is already taken")]
    DuplicatedUserName,
    /// The referenced user does not exist
    #[error("User not found")]
    UserNotFound,
    /// The password did not match the stored hash
    #[error("Invalid password")]
    InvalidPassword,
    /// The referenced post does not exist
    #[error("Post not found")]
    PostNotFound,
    /// The user does not own the object being changed
    #[error("Permission denied")]
    InvalidPermission,
    /// The user has already liked this post
    #[error("Post already liked")]
    AlreadyLiked,
}

impl HttpError for Error {
    type Detail = ();

    fn status_code(&self) -> StatusCode {
        match self {
            Error::ServerStart | Error::Shutdown | Error::Db | Error::AuthSubsystem => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Filter => StatusCode::BAD_REQUEST,
            Error::DuplicatedUserName | Error::AlreadyLiked => StatusCode::CONFLICT,
            Error::UserNotFound | Error::PostNotFound => StatusCode::NOT_FOUND,
            Error::InvalidPassword | Error::InvalidPermission => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Error::ServerStart => "server_start",
            Error::Shutdown => "shutdown",
            Error::Db => "database",
            Error::Filter => "invalid_filter",
            Error::AuthSubsystem => "auth_subsystem",
            Error::DuplicatedUserName => "duplicated_user_name",
            Error::UserNotFound => "user_not_found",
            Error::InvalidPassword => "invalid_password",
            Error::PostNotFound => "post_not_found",
            Error::InvalidPermission => "invalid_permission",
            Error::AlreadyLiked => "already_liked",
        }
    }

    fn error_detail(&self) {}
}

/// Convert the error from an insert, reporting a unique index violation as `conflict` and
/// anything else as [Error::Db].
pub fn insert_error(e: sqlx::Error, conflict: Error) -> Report<Error> {
    let unique_violation =
        matches!(&e, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
    if unique_violation {
        Report::new(e).change_context(conflict)
    } else {
        Report::new(e).change_context(Error::Db)
    }
}
