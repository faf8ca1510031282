use std::str::FromStr;

use chrono::Utc;
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{event, instrument, Level};

use super::{types::*, PostId};
use crate::{
    models::{
        comment, like,
        user::{self, User, UserId},
    },
    pagination::{split_order_by, OrderByError, Page, PageQuery},
    Error,
};

const POST_SELECT: &str = "SELECT posts.id, posts.title, posts.body, posts.user_id,
    users.user_name, posts.registered_at, posts.updated_at, posts.deleted_at
    FROM posts
    JOIN users ON users.id = posts.user_id";

/// Get a live post.
#[instrument(skip(db))]
pub async fn get(db: impl SqliteExecutor<'_>, id: PostId) -> Result<Post, Report<Error>> {
    let q = format!("{POST_SELECT} WHERE posts.id = ? AND posts.deleted_at IS NULL");
    sqlx::query_as::<_, Post>(&q)
        .bind(id)
        .fetch_optional(db)
        .await
        .change_context(Error::Db)?
        .ok_or(Error::PostNotFound)
        .attach_printable_lazy(|| format!("{id} not found"))
}

/// Create a post owned by the named user.
#[instrument(skip(db, payload))]
pub async fn create(
    db: &mut SqliteConnection,
    user_name: &str,
    payload: PostCreatePayload,
) -> Result<Post, Report<Error>> {
    let user = user::queries::get_by_user_name(&mut *db, user_name).await?;
    create_raw(db, PostId::new(), user.id, payload).await
}

/// Create a post with an explicit ID and owner. This does no lookups or permission checks.
#[instrument(skip(db, payload))]
pub async fn create_raw(
    db: &mut SqliteConnection,
    id: PostId,
    user_id: UserId,
    payload: PostCreatePayload,
) -> Result<Post, Report<Error>> {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO posts (id, user_id, title, body, registered_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(&payload.title)
    .bind(&payload.body)
    .bind(now)
    .bind(now)
    .execute(&mut *db)
    .await
    .change_context(Error::Db)?;

    event!(Level::INFO, %id, %user_id, "Created post");
    get(&mut *db, id).await
}

fn check_owner(post: &Post, user: &User) -> Result<(), Report<Error>> {
    if post.user_id != user.id {
        return Err(Report::new(Error::InvalidPermission).attach_printable(format!(
            "{} has no permission with {}",
            user.user_name, post.id
        )));
    }

    Ok(())
}

/// Change the title and body of a post. Only the owner of the post may do this.
#[instrument(skip(db, payload))]
pub async fn update(
    db: &mut SqliteConnection,
    user_name: &str,
    id: PostId,
    payload: PostUpdatePayload,
) -> Result<Post, Report<Error>> {
    let user = user::queries::get_by_user_name(&mut *db, user_name).await?;
    let post = get(&mut *db, id).await?;
    check_owner(&post, &user)?;

    sqlx::query("UPDATE posts SET title = ?, body = ?, updated_at = ? WHERE id = ?")
        .bind(&payload.title)
        .bind(&payload.body)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *db)
        .await
        .change_context(Error::Db)?;

    get(&mut *db, id).await
}

/// Delete a post along with its comments and likes. Only the owner of the post may do this.
#[instrument(skip(db))]
pub async fn delete(
    db: &mut SqliteConnection,
    user_name: &str,
    id: PostId,
) -> Result<(), Report<Error>> {
    let user = user::queries::get_by_user_name(&mut *db, user_name).await?;
    let post = get(&mut *db, id).await?;
    check_owner(&post, &user)?;

    let comments = comment::queries::delete_all_for_post(&mut *db, id).await?;
    let likes = like::queries::delete_all_for_post(&mut *db, id).await?;

    sqlx::query("UPDATE posts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *db)
        .await
        .change_context(Error::Db)?;

    event!(Level::INFO, %id, %comments, %likes, "Deleted post");
    Ok(())
}

/// Delete every post, and every comment and like attached to them. Returns the number of posts
/// deleted.
#[instrument(skip(db))]
pub async fn delete_all(db: &mut SqliteConnection) -> Result<u64, Report<Error>> {
    let now = Utc::now();

    for q in [
        "UPDATE comments SET deleted_at = ? WHERE deleted_at IS NULL",
        "UPDATE likes SET deleted_at = ? WHERE deleted_at IS NULL",
    ] {
        sqlx::query(q)
            .bind(now)
            .execute(&mut *db)
            .await
            .change_context(Error::Db)?;
    }

    let result = sqlx::query("UPDATE posts SET deleted_at = ? WHERE deleted_at IS NULL")
        .bind(now)
        .execute(&mut *db)
        .await
        .change_context(Error::Db)?;

    event!(Level::WARN, count = %result.rows_affected(), "Deleted all posts");
    Ok(result.rows_affected())
}

#[derive(Debug, Default, PartialEq, Eq)]
enum OrderByField {
    #[default]
    RegisteredAt,
    UpdatedAt,
}

impl OrderByField {
    fn as_str(&self) -> &str {
        match self {
            Self::RegisteredAt => "registered_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for OrderByField {
    type Err = OrderByError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = match s {
            "registered_at" => OrderByField::RegisteredAt,
            "updated_at" => OrderByField::UpdatedAt,
            _ => return Err(OrderByError(s.to_string())),
        };

        Ok(value)
    }
}

fn parse_order_by(field: &str) -> Result<(bool, OrderByField), OrderByError> {
    let (descending, field) = split_order_by(field);
    let value = OrderByField::from_str(field)?;
    Ok((descending, value))
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ListQueryFilters {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub order_by: Option<String>,
}

impl ListQueryFilters {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// List all live posts.
#[instrument(skip(db))]
pub async fn list(
    db: &SqlitePool,
    filters: &ListQueryFilters,
) -> Result<Page<Post>, Report<Error>> {
    list_internal(db, None, filters).await
}

/// List the live posts written by the named user.
#[instrument(skip(db))]
pub async fn list_for_user(
    db: &SqlitePool,
    user_name: &str,
    filters: &ListQueryFilters,
) -> Result<Page<Post>, Report<Error>> {
    let user = user::queries::get_by_user_name(db, user_name).await?;
    list_internal(db, Some(user.id), filters).await
}

async fn list_internal(
    db: &SqlitePool,
    user_id: Option<UserId>,
    filters: &ListQueryFilters,
) -> Result<Page<Post>, Report<Error>> {
    let (descending, order_by_field) =
        parse_order_by(filters.order_by.as_deref().unwrap_or("-registered_at"))
            .change_context(Error::Filter)?;
    let order_direction = if descending { "DESC" } else { "ASC" };

    let where_clause = if user_id.is_some() {
        "posts.deleted_at IS NULL AND posts.user_id = ?"
    } else {
        "posts.deleted_at IS NULL"
    };
    event!(Level::DEBUG, %where_clause, ?order_by_field, %order_direction);

    let count_q = format!("SELECT COUNT(*) FROM posts WHERE {where_clause}");
    let q = format!(
        "{POST_SELECT} WHERE {where_clause}
        ORDER BY posts.{field} {order_direction}, posts.id {order_direction}
        LIMIT ? OFFSET ?",
        field = order_by_field.as_str()
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_q);
    let mut query = sqlx::query_as::<_, Post>(&q);
    if let Some(user_id) = user_id {
        count_query = count_query.bind(user_id);
        query = query.bind(user_id);
    }

    let page = filters.page_query();
    let (limit, offset) = page.limit_offset();
    query = query.bind(limit).bind(offset);

    let total = count_query.fetch_one(db).await.change_context(Error::Db)?;
    let results = query.fetch_all(db).await.change_context(Error::Db)?;

    Ok(Page::new(results, &page, total))
}
