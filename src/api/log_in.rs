//! Exchanging a username and password for an API token.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use crate::{
    Error, FieldErrors,
    api::{
        ApiError, ApiState,
        token::encode_token,
        users::{UserBody, UserEnvelope},
    },
    auth::authenticate,
};

/// The credentials sent to the log-in endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LogInBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Check the credentials and return the user with a new token.
///
/// Unknown usernames and wrong passwords get the same 401 response.
pub async fn log_in(
    State(state): State<ApiState>,
    payload: Result<Json<UserEnvelope<LogInBody>>, JsonRejection>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let Json(UserEnvelope { user: credentials }) = payload?;

    let mut errors = FieldErrors::new();
    if credentials.username.trim().is_empty() {
        errors.add("username", "This field is required.");
    }
    if credentials.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        authenticate(&credentials.username, &credentials.password, &connection)?
    };

    let token = encode_token(user.id, &state.api_token_keys)?;
    tracing::info!("User {} logged in through the API", user.id);

    Ok(Json(UserEnvelope {
        user: UserBody::new(user, Some(token)),
    }))
}
