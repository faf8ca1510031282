use serde::{Deserialize, Serialize};

use super::LikeId;
use crate::models::{post::PostId, user::UserId};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Like {
    pub id: LikeId,
    pub user_id: UserId,
    pub post_id: PostId,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}
