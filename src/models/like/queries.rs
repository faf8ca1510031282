use chrono::Utc;
use error_stack::{Report, ResultExt};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{event, instrument, Level};

use super::{types::*, LikeId};
use crate::{
    error::insert_error,
    models::{
        alarm::{self, AlarmArgs, AlarmType},
        post::{self, PostId},
        user::{self, UserId},
    },
    Error,
};

/// Like a post on behalf of the named user, and send an alarm to the owner of the post.
/// A user can like a post only once.
#[instrument(skip(db))]
pub async fn create(
    db: &mut SqliteConnection,
    post_id: PostId,
    user_name: &str,
) -> Result<Like, Report<Error>> {
    let post = post::queries::get(&mut *db, post_id).await?;
    let user = user::queries::get_by_user_name(&mut *db, user_name).await?;

    let existing = sqlx::query_scalar::<_, LikeId>(
        "SELECT id FROM likes WHERE user_id = ? AND post_id = ? AND deleted_at IS NULL",
    )
    .bind(user.id)
    .bind(post.id)
    .fetch_optional(&mut *db)
    .await
    .change_context(Error::Db)?;

    if existing.is_some() {
        return Err(Report::new(Error::AlreadyLiked).attach_printable(format!(
            "userName {user_name} already like post {post_id}"
        )));
    }

    let like = create_raw(&mut *db, LikeId::new(), user.id, post.id)
        .await
        .map_err(|e| {
            if matches!(e.current_context(), Error::AlreadyLiked) {
                e.attach_printable(format!("userName {user_name} already like post {post_id}"))
            } else {
                e
            }
        })?;

    alarm::queries::create(
        &mut *db,
        post.user_id,
        AlarmType::NewLikeOnPost,
        AlarmArgs {
            from_user_id: user.id,
            target_id: post.id,
        },
    )
    .await?;

    event!(Level::INFO, id = %like.id, %post_id, user_id = %user.id, "Created like");
    Ok(like)
}

/// Insert a like without any lookups. A second live like by the same user on the same post fails
/// with [Error::AlreadyLiked].
#[instrument(skip(db))]
pub async fn create_raw(
    db: impl SqliteExecutor<'_>,
    id: LikeId,
    user_id: UserId,
    post_id: PostId,
) -> Result<Like, Report<Error>> {
    let now = Utc::now();
    sqlx::query_as::<_, Like>(
        "INSERT INTO likes (id, user_id, post_id, registered_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, user_id, post_id, registered_at, updated_at, deleted_at",
    )
    .bind(id)
    .bind(user_id)
    .bind(post_id)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
    .map_err(|e| insert_error(e, Error::AlreadyLiked))
}

/// Count the live likes on a post.
#[instrument(skip(db))]
pub async fn count_for_post(db: &SqlitePool, post_id: PostId) -> Result<i64, Report<Error>> {
    let post = post::queries::get(db, post_id).await?;

    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM likes WHERE post_id = ? AND deleted_at IS NULL",
    )
    .bind(post.id)
    .fetch_one(db)
    .await
    .change_context(Error::Db)
}

/// Delete all the likes on a post. This function does not do permissions checks.
#[instrument(skip(db))]
pub async fn delete_all_for_post(
    db: impl SqliteExecutor<'_>,
    post_id: PostId,
) -> Result<u64, Report<Error>> {
    let result =
        sqlx::query("UPDATE likes SET deleted_at = ? WHERE post_id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(post_id)
            .execute(db)
            .await
            .change_context(Error::Db)?;

    Ok(result.rows_affected())
}
