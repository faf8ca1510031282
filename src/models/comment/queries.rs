use chrono::Utc;
use error_stack::{Report, ResultExt};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{event, instrument, Level};

use super::{types::*, CommentId};
use crate::{
    models::{
        alarm::{self, AlarmArgs, AlarmType},
        post::{self, PostId},
        user,
    },
    pagination::{Page, PageQuery},
    Error,
};

const COMMENT_SELECT: &str = "SELECT comments.id, comments.comment, comments.user_id,
    users.user_name, comments.post_id, comments.registered_at, comments.updated_at,
    comments.deleted_at
    FROM comments
    JOIN users ON users.id = comments.user_id";

/// Add a comment to a post, and send an alarm to the owner of the post.
#[instrument(skip(db, payload))]
pub async fn create(
    db: &mut SqliteConnection,
    post_id: PostId,
    user_name: &str,
    payload: CommentCreatePayload,
) -> Result<Comment, Report<Error>> {
    let post = post::queries::get(&mut *db, post_id).await?;
    let user = user::queries::get_by_user_name(&mut *db, user_name).await?;

    let id = CommentId::new();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO comments (id, user_id, post_id, comment, registered_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user.id)
    .bind(post.id)
    .bind(&payload.comment)
    .bind(now)
    .bind(now)
    .execute(&mut *db)
    .await
    .change_context(Error::Db)?;

    alarm::queries::create(
        &mut *db,
        post.user_id,
        AlarmType::NewCommentOnPost,
        AlarmArgs {
            from_user_id: user.id,
            target_id: post.id,
        },
    )
    .await?;

    event!(Level::INFO, %id, %post_id, user_id = %user.id, "Created comment");

    let q = format!("{COMMENT_SELECT} WHERE comments.id = ?");
    sqlx::query_as::<_, Comment>(&q)
        .bind(id)
        .fetch_one(&mut *db)
        .await
        .change_context(Error::Db)
}

/// List the live comments on a post, newest first.
#[instrument(skip(db))]
pub async fn list_for_post(
    db: &SqlitePool,
    post_id: PostId,
    page: &PageQuery,
) -> Result<Page<Comment>, Report<Error>> {
    let post = post::queries::get(db, post_id).await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM comments WHERE post_id = ? AND deleted_at IS NULL",
    )
    .bind(post.id)
    .fetch_one(db)
    .await
    .change_context(Error::Db)?;

    let (limit, offset) = page.limit_offset();
    let q = format!(
        "{COMMENT_SELECT} WHERE comments.post_id = ? AND comments.deleted_at IS NULL
        ORDER BY comments.registered_at DESC, comments.id DESC
        LIMIT ? OFFSET ?"
    );

    let results = sqlx::query_as::<_, Comment>(&q)
        .bind(post.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .change_context(Error::Db)?;

    Ok(Page::new(results, page, total))
}

/// Delete all the comments on a post. This function does not do permissions checks.
#[instrument(skip(db))]
pub async fn delete_all_for_post(
    db: impl SqliteExecutor<'_>,
    post_id: PostId,
) -> Result<u64, Report<Error>> {
    let result = sqlx::query(
        "UPDATE comments SET deleted_at = ? WHERE post_id = ? AND deleted_at IS NULL",
    )
    .bind(Utc::now())
    .bind(post_id)
    .execute(db)
    .await
    .change_context(Error::Db)?;

    Ok(result.rows_affected())
}
