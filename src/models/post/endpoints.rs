use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing,
};
use axum_extra::extract::Query;
use axum_jsonschema::Json;
use error_stack::ResultExt;

use super::{queries, types::*, PostId};
use crate::{
    auth::Authed,
    errors::WrapReport,
    models::{comment, comment::CommentCreatePayload, like},
    pagination::PageQuery,
    server::ServerState,
    Error,
};

async fn get(
    State(state): State<ServerState>,
    _auth: Authed,
    Path(id): Path<PostId>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let object = queries::get(&state.db, id).await?;

    Ok(Json(object))
}

async fn list(
    State(state): State<ServerState>,
    _auth: Authed,
    Query(qs): Query<queries::ListQueryFilters>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let results = queries::list(&state.db, &qs).await?;

    Ok(Json(results))
}

async fn my(
    State(state): State<ServerState>,
    auth: Authed,
    Query(qs): Query<queries::ListQueryFilters>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let results = queries::list_for_user(&state.db, &auth.user_name, &qs).await?;

    Ok(Json(results))
}

async fn create(
    State(state): State<ServerState>,
    auth: Authed,
    Json(payload): Json<PostCreatePayload>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    let result = queries::create(&mut *tx, &auth.user_name, payload).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok((StatusCode::CREATED, Json(result)))
}

async fn update(
    State(state): State<ServerState>,
    auth: Authed,
    Path(id): Path<PostId>,
    Json(payload): Json<PostUpdatePayload>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    let result = queries::update(&mut *tx, &auth.user_name, id, payload).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok(Json(result))
}

async fn delete(
    State(state): State<ServerState>,
    auth: Authed,
    Path(id): Path<PostId>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    queries::delete(&mut *tx, &auth.user_name, id).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok(StatusCode::OK)
}

async fn create_like(
    State(state): State<ServerState>,
    auth: Authed,
    Path(id): Path<PostId>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    let result = like::queries::create(&mut *tx, id, &auth.user_name).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok((StatusCode::CREATED, Json(result)))
}

async fn like_count(
    State(state): State<ServerState>,
    _auth: Authed,
    Path(id): Path<PostId>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let count = like::queries::count_for_post(&state.db, id).await?;

    Ok(Json(count))
}

async fn create_comment(
    State(state): State<ServerState>,
    auth: Authed,
    Path(id): Path<PostId>,
    Json(payload): Json<CommentCreatePayload>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    let result = comment::queries::create(&mut *tx, id, &auth.user_name, payload).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok((StatusCode::CREATED, Json(result)))
}

async fn list_comments(
    State(state): State<ServerState>,
    _auth: Authed,
    Path(id): Path<PostId>,
    Query(qs): Query<PageQuery>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let results = comment::queries::list_for_post(&state.db, id, &qs).await?;

    Ok(Json(results))
}

pub fn create_routes() -> axum::Router<ServerState> {
    axum::Router::new()
        .route("/posts", routing::get(list).post(create))
        .route("/posts/my", routing::get(my))
        .route(
            "/posts/:id",
            routing::get(get).put(update).delete(delete),
        )
        .route(
            "/posts/:id/likes",
            routing::get(like_count).post(create_like),
        )
        .route(
            "/posts/:id/comments",
            routing::get(list_comments).post(create_comment),
        )
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::tests::{start_app, ResponseExt, TestUser};

    async fn create_post(user: &TestUser, i: usize) -> serde_json::Value {
        user.client
            .post("posts")
            .json(&json!({ "title": format!("Post {i}"), "body": format!("Body {i}") }))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn healthz(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let response = reqwest::get(format!("{}/healthz", app.base_url))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        app.shutdown().await.unwrap();
    }

    #[sqlx::test]
    async fn concurrent_creates(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let requests = (0..20).map(|i| {
            let user = if i % 2 == 0 { &app.alice } else { &app.bob };
            user.client
                .post("posts")
                .json(&json!({ "title": format!("Post {i}"), "body": "body" }))
                .send()
        });

        for response in futures::future::join_all(requests).await {
            let response = response.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        }

        let all: serde_json::Value = app
            .alice
            .client
            .get("posts")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all["total_elements"], 20);
    }

    #[sqlx::test]
    async fn crud_flow(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let created = create_post(&app.alice, 1).await;
        assert_eq!(created["title"], "Post 1");
        assert_eq!(created["user_name"], "alice");
        let id = created["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("pst"));

        let fetched: serde_json::Value = app
            .bob
            .client
            .get(format!("posts/{id}"))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched, created);

        let updated: serde_json::Value = app
            .alice
            .client
            .put(format!("posts/{id}"))
            .json(&json!({ "title": "New title", "body": "New body" }))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(updated["title"], "New title");
        assert_eq!(updated["body"], "New body");
        assert_eq!(updated["registered_at"], created["registered_at"]);

        app.alice
            .client
            .delete(format!("posts/{id}"))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap();

        let response = app
            .alice
            .client
            .get(format!("posts/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "post_not_found");
    }

    #[sqlx::test]
    async fn requires_token(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let response = app
            .client
            .post("posts")
            .json(&json!({ "title": "title", "body": "body" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        let response = app.client.get("posts").send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn only_owner_can_modify(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let created = create_post(&app.alice, 1).await;
        let id = created["id"].as_str().unwrap();

        let response = app
            .bob
            .client
            .put(format!("posts/{id}"))
            .json(&json!({ "title": "Stolen", "body": "Stolen" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "invalid_permission");
        assert_eq!(
            body["error"]["details"][0],
            format!("bob has no permission with {id}")
        );

        let response = app
            .bob
            .client
            .delete(format!("posts/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        let fetched: serde_json::Value = app
            .alice
            .client
            .get(format!("posts/{id}"))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["title"], "Post 1");
    }

    #[sqlx::test]
    async fn list_and_my(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        create_post(&app.alice, 1).await;
        create_post(&app.bob, 2).await;
        create_post(&app.bob, 3).await;

        let all: serde_json::Value = app
            .alice
            .client
            .get("posts")
            .query(&[("per_page", "2")])
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all["total_elements"], 3);
        assert_eq!(all["total_pages"], 2);
        assert_eq!(all["content"].as_array().unwrap().len(), 2);

        let mine: serde_json::Value = app
            .alice
            .client
            .get("posts/my")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(mine["total_elements"], 1);
        assert_eq!(mine["content"][0]["title"], "Post 1");

        let response = app
            .alice
            .client
            .get("posts")
            .query(&[("order_by", "title")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "invalid_filter");
    }

    #[sqlx::test]
    async fn likes_and_alarms(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let created = create_post(&app.alice, 1).await;
        let id = created["id"].as_str().unwrap();

        let like: serde_json::Value = app
            .bob
            .client
            .post(format!("posts/{id}/likes"))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(like["post_id"], id);
        assert_eq!(like["user_id"], app.bob.user_id.to_string());

        let response = app
            .bob
            .client
            .post(format!("posts/{id}/likes"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"]["kind"], "already_liked");

        let count: i64 = app
            .alice
            .client
            .get(format!("posts/{id}/likes"))
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(count, 1);

        let alarms: serde_json::Value = app
            .alice
            .client
            .get("users/alarm")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(alarms["total_elements"], 1);
        let alarm = &alarms["content"][0];
        assert_eq!(alarm["alarm_type"], "NEW_LIKE_ON_POST");
        assert_eq!(alarm["text"], "new like!");
        assert_eq!(alarm["args"]["from_user_id"], app.bob.user_id.to_string());
        assert_eq!(alarm["args"]["target_id"], id);

        let bob_alarms: serde_json::Value = app
            .bob
            .client
            .get("users/alarm")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(bob_alarms["total_elements"], 0);
    }

    #[sqlx::test]
    async fn like_missing_post(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let id = super::PostId::new();
        let response = app
            .bob
            .client
            .post(format!("posts/{id}/likes"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    async fn comments_and_alarms(pool: sqlx::SqlitePool) {
        let app = start_app(pool).await;

        let created = create_post(&app.alice, 1).await;
        let id = created["id"].as_str().unwrap();

        for i in 0..3 {
            app.bob
                .client
                .post(format!("posts/{id}/comments"))
                .json(&json!({ "comment": format!("Comment {i}") }))
                .send()
                .await
                .unwrap()
                .log_error()
                .await
                .unwrap();
        }

        let response = app
            .bob
            .client
            .post(format!("posts/{id}/comments"))
            .json(&json!({ "comment": "" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let comments: serde_json::Value = app
            .alice
            .client
            .get(format!("posts/{id}/comments"))
            .query(&[("per_page", "2")])
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(comments["total_elements"], 3);
        assert_eq!(comments["content"].as_array().unwrap().len(), 2);
        assert_eq!(comments["content"][0]["user_name"], "bob");

        let alarms: serde_json::Value = app
            .alice
            .client
            .get("users/alarm")
            .send()
            .await
            .unwrap()
            .log_error()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(alarms["total_elements"], 3);
        assert_eq!(alarms["content"][0]["alarm_type"], "NEW_COMMENT_ON_POST");
        assert_eq!(alarms["content"][0]["text"], "new comment!");
    }
}
