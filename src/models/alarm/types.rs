use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use tracing::{event, Level};

use super::AlarmId;
use crate::models::{post::PostId, user::UserId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmType {
    NewCommentOnPost,
    NewLikeOnPost,
}

impl AlarmType {
    /// The message shown to the user for this kind of alarm.
    pub fn alarm_text(&self) -> &'static str {
        match self {
            Self::NewCommentOnPost => "new comment!",
            Self::NewLikeOnPost => "new like!",
        }
    }
}

/// Who caused the alarm and which post it concerns.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmArgs {
    pub from_user_id: UserId,
    pub target_id: PostId,
}

/// An alarm as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlarmRow {
    pub id: AlarmId,
    /// The user receiving the alarm
    pub user_id: UserId,
    pub alarm_type: AlarmType,
    pub args: Json<AlarmArgs>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An alarm as returned to the user it was sent to.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Alarm {
    pub id: AlarmId,
    pub alarm_type: AlarmType,
    pub args: AlarmArgs,
    pub text: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<AlarmRow> for Alarm {
    fn from(row: AlarmRow) -> Self {
        event!(Level::TRACE, id = %row.id, "Converting alarm row");
        Alarm {
            id: row.id,
            alarm_type: row.alarm_type,
            args: row.args.0,
            text: row.alarm_type.alarm_text().to_string(),
            registered_at: row.registered_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}
