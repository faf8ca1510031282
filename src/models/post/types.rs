use serde::{Deserialize, Serialize};

use super::PostId;
use crate::models::user::UserId;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,
    /// The user who wrote the post
    pub user_id: UserId,
    pub user_name: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize, Debug, Clone, schemars::JsonSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct PostCreatePayloadAndUpdatePayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub body: String,
}

pub type PostCreatePayload = PostCreatePayloadAndUpdatePayload;

pub type PostUpdatePayload = PostCreatePayloadAndUpdatePayload;
