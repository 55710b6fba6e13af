//! An extractor for pages that show something different to logged in users.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::{UserID, auth::cookie::get_token_from_cookies};

/// The ID of the logged in user, or `None` for anonymous visitors.
///
/// Unlike [crate::auth::auth_guard], this never redirects and does not extend
/// the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentUser(pub Option<UserID>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state).await?;

        Ok(Self(get_token_from_cookies(&jar).ok().map(|token| token.user_id)))
    }
}
