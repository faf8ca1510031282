use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    User,
}

/// A registered user. The password hash is never loaded into this struct.
#[derive(Serialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub user_name: String,
    pub role: UserRole,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize, Debug, Clone, schemars::JsonSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct UserJoinPayload {
    #[validate(length(min = 1, max = 64))]
    pub user_name: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Deserialize, Debug, Clone, schemars::JsonSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct UserLoginPayload {
    #[validate(length(min = 1))]
    pub user_name: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserLoginResponse {
    pub token: String,
}
