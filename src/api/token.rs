//! Signed bearer tokens for the REST API.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error, UserID,
    api::{
        ApiError, ApiTokenKeys,
        error::{INVALID_TOKEN_MSG, NO_CREDENTIALS_MSG},
    },
};

/// How long an API token is valid for.
pub const TOKEN_DURATION: Duration = Duration::days(1);

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// The expiry time of the token as a Unix timestamp.
    pub exp: i64,
    /// The time the token was issued as a Unix timestamp.
    pub iat: i64,
}

/// Create a token for `user_id` that expires after [TOKEN_DURATION].
///
/// # Errors
///
/// Returns [Error::TokenError] if the token could not be signed.
pub fn encode_token(user_id: UserID, keys: &ApiTokenKeys) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id.as_i64(),
        exp: (now + TOKEN_DURATION).unix_timestamp(),
        iat: now.unix_timestamp(),
    };

    encode(&Header::default(), &claims, keys.encoding_key()).map_err(|error| {
        tracing::error!("Could not sign API token: {error}");
        Error::TokenError(error.to_string())
    })
}

/// Check the signature and expiry of `token` and return its claims.
fn decode_token(token: &str, keys: &ApiTokenKeys) -> Result<Claims, ApiError> {
    decode::<Claims>(token, keys.decoding_key(), &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|error| {
            tracing::debug!("Rejected API token: {error}");
            ApiError::Unauthorized(INVALID_TOKEN_MSG)
        })
}

/// The user who owns the token in the `Authorization` header.
///
/// Both the `Token` and `Bearer` schemes are accepted. Requests without a
/// valid token are rejected with a 401 JSON response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApiUser(pub UserID);

impl<S> FromRequestParts<S> for ApiUser
where
    ApiTokenKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::Unauthorized(NO_CREDENTIALS_MSG))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized(INVALID_TOKEN_MSG))?;

        let token = header
            .strip_prefix("Token ")
            .or_else(|| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized(INVALID_TOKEN_MSG))?;

        let keys = ApiTokenKeys::from_ref(state);
        let claims = decode_token(token, &keys)?;

        Ok(Self(UserID::new(claims.sub)))
    }
}

#[cfg(test)]
mod token_tests {
    use jsonwebtoken::{Header, encode};
    use time::OffsetDateTime;

    use crate::{
        UserID,
        api::{ApiError, ApiTokenKeys, error::INVALID_TOKEN_MSG},
    };

    use super::{Claims, TOKEN_DURATION, decode_token, encode_token};

    #[test]
    fn decoded_token_has_user_id_and_one_day_expiry() {
        let keys = ApiTokenKeys::new("foobar");

        let token = encode_token(UserID::new(7), &keys).unwrap();
        let claims = decode_token(&token, &keys).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.exp - claims.iat, TOKEN_DURATION.whole_seconds());
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let token = encode_token(UserID::new(7), &ApiTokenKeys::new("foobar")).unwrap();

        let result = decode_token(&token, &ApiTokenKeys::new("bazqux"));

        assert_eq!(result, Err(ApiError::Unauthorized(INVALID_TOKEN_MSG)));
    }

    #[test]
    fn rejects_expired_token() {
        let keys = ApiTokenKeys::new("foobar");
        let issued = OffsetDateTime::now_utc().unix_timestamp() - 3 * 24 * 60 * 60;
        let claims = Claims {
            sub: 7,
            exp: issued + TOKEN_DURATION.whole_seconds(),
            iat: issued,
        };
        let token = encode(&Header::default(), &claims, keys.encoding_key()).unwrap();

        let result = decode_token(&token, &keys);

        assert_eq!(result, Err(ApiError::Unauthorized(INVALID_TOKEN_MSG)));
    }
}
