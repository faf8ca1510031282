use chrono::Utc;
use error_stack::{Report, ResultExt};
use sqlx::{types::Json, SqliteExecutor, SqlitePool};
use tracing::{event, instrument, Level};

use super::{types::*, AlarmId};
use crate::{
    models::user::UserId,
    pagination::{Page, PageQuery},
    Error,
};

const ALARM_COLUMNS: &str =
    "id, user_id, alarm_type, args, registered_at, updated_at, deleted_at";

/// Record an alarm for `user_id`.
#[instrument(skip(db))]
pub async fn create(
    db: impl SqliteExecutor<'_>,
    user_id: UserId,
    alarm_type: AlarmType,
    args: AlarmArgs,
) -> Result<Alarm, Report<Error>> {
    let now = Utc::now();
    let q = format!(
        "INSERT INTO alarms (id, user_id, alarm_type, args, registered_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {ALARM_COLUMNS}"
    );

    let row = sqlx::query_as::<_, AlarmRow>(&q)
        .bind(AlarmId::new())
        .bind(user_id)
        .bind(alarm_type)
        .bind(Json(args))
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await
        .change_context(Error::Db)?;

    event!(Level::DEBUG, alarm_id = %row.id, ?alarm_type, "Created alarm");
    Ok(row.into())
}

/// List the live alarms for a user, newest first.
#[instrument(skip(db))]
pub async fn list_for_user(
    db: &SqlitePool,
    user_id: UserId,
    page: &PageQuery,
) -> Result<Page<Alarm>, Report<Error>> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM alarms WHERE user_id = ? AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
    .change_context(Error::Db)?;

    let (limit, offset) = page.limit_offset();
    let q = format!(
        "SELECT {ALARM_COLUMNS} FROM alarms
        WHERE user_id = ? AND deleted_at IS NULL
        ORDER BY registered_at DESC, id DESC
        LIMIT ? OFFSET ?"
    );

    let rows = sqlx::query_as::<_, AlarmRow>(&q)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .change_context(Error::Db)?;

    Ok(Page::new(rows, page, total).map(Alarm::from))
}
