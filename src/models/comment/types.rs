use serde::{Deserialize, Serialize};

use super::CommentId;
use crate::models::{post::PostId, user::UserId};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: CommentId,
    pub comment: String,
    pub user_id: UserId,
    pub user_name: String,
    pub post_id: PostId,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize, Debug, Clone, schemars::JsonSchema)]
#[cfg_attr(test, derive(Serialize))]
pub struct CommentCreatePayload {
    #[validate(length(min = 1))]
    pub comment: String,
}
