use std::ops::Deref;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use error_stack::Report;

use super::{sessions, AuthError, AuthInfo};
use crate::{errors::WrapReport, server::ServerState};

/// Extract authentication info from the `Authorization: Bearer` header, or reject the request
/// if there is no live session for the token.
#[derive(Debug, Clone)]
pub struct Authed(pub AuthInfo);

impl Deref for Authed {
    type Target = AuthInfo;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authed
where
    ServerState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WrapReport<AuthError>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| Report::new(AuthError::InvalidToken).attach_printable(e.to_string()))?;

        let state = ServerState::from_ref(state);
        let auth_info = sessions::lookup_session(&state.db, bearer.token()).await?;
        Ok(Authed(auth_info))
    }
}
