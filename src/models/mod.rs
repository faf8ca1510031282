pub mod alarm;
pub mod comment;
pub mod like;
pub mod post;
pub mod user;

use crate::server::ServerState;

pub fn create_routes() -> axum::Router<ServerState> {
    axum::Router::new()
        .merge(user::endpoints::create_routes())
        .merge(post::endpoints::create_routes())
}
