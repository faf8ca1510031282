use axum::{extract::State, http::StatusCode, response::IntoResponse, routing};
use axum_extra::extract::Query;
use axum_jsonschema::Json;
use error_stack::ResultExt;

use super::{queries, types::*};
use crate::{
    auth::Authed, errors::WrapReport, models::alarm, pagination::PageQuery,
    server::ServerState, Error,
};

async fn join(
    State(state): State<ServerState>,
    Json(payload): Json<UserJoinPayload>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    let user = queries::join(&mut *tx, payload).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<UserLoginPayload>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let mut tx = state.db_writer.begin().await.change_context(Error::Db)?;
    let response = queries::login(&mut *tx, payload, state.session_expiry).await?;
    tx.commit().await.change_context(Error::Db)?;

    Ok(Json(response))
}

async fn alarm_list(
    State(state): State<ServerState>,
    auth: Authed,
    Query(qs): Query<PageQuery>,
) -> Result<impl IntoResponse, WrapReport<Error>> {
    let results = alarm::queries::list_for_user(&state.db, auth.user_id, &qs).await?;

    Ok(Json(results))
}

pub fn create_routes() -> axum::Router<ServerState> {
    axum::Router::new()
        .route("/users/join", routing::post(join))
        .route("/users/login", routing::post(login))
        .route("/users/alarm", routing::get(alarm_list))
}
