//! Reading and updating the user who owns the request token.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    Email, Error, FieldErrors, PasswordHash, User, UserID, Username, ValidatedPassword,
    api::{
        ApiError, ApiState, ApiUser,
        error::INVALID_TOKEN_MSG,
        users::{UserBody, UserEnvelope},
    },
    user::{UserUpdate, get_user_by_id, update_user},
};

/// The fields a user may change, absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Get the user who owns the request token.
pub async fn get_current_user(
    ApiUser(user_id): ApiUser,
    State(state): State<ApiState>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_token_user(user_id, &connection)?;

    Ok(Json(UserEnvelope {
        user: UserBody::new(user, None),
    }))
}

/// Update the username, email or password of the user who owns the request token.
///
/// Serves both PUT and PATCH, in both cases only the fields that are sent are
/// changed.
pub async fn update_current_user(
    ApiUser(user_id): ApiUser,
    State(state): State<ApiState>,
    payload: Result<Json<UserEnvelope<UserUpdateBody>>, JsonRejection>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let Json(UserEnvelope { user: body }) = payload?;

    let current_user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_token_user(user_id, &connection)?
    };

    let update = check_update(&body, &current_user)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = update_user(user_id, update, &connection)?;
    tracing::info!("User {} updated their account", user.id);

    Ok(Json(UserEnvelope {
        user: UserBody::new(user, None),
    }))
}

/// A valid token for a deleted user is treated as an invalid token.
fn get_token_user(user_id: UserID, connection: &Connection) -> Result<User, ApiError> {
    match get_user_by_id(user_id, connection) {
        Ok(user) if user.is_active => Ok(user),
        Ok(_) | Err(Error::NotFound) => Err(ApiError::Unauthorized(INVALID_TOKEN_MSG)),
        Err(error) => Err(error.into()),
    }
}

/// Validate the sent fields and hash a new password.
fn check_update(body: &UserUpdateBody, current_user: &User) -> Result<UserUpdate, ApiError> {
    let mut errors = FieldErrors::new();

    let username = body.username.as_deref().and_then(|raw_username| {
        Username::new(raw_username)
            .inspect_err(|message| errors.add("username", message.clone()))
            .ok()
    });
    let email = body.email.as_deref().and_then(|raw_email| {
        Email::new(raw_email)
            .inspect_err(|message| errors.add("email", message.clone()))
            .ok()
    });

    let password = body.password.as_deref().and_then(|raw_password| {
        let new_username = username.as_ref().unwrap_or(&current_user.username);
        let new_email = email.as_ref().unwrap_or(&current_user.email);

        ValidatedPassword::new(raw_password, &[new_username.as_ref(), new_email.as_ref()])
            .inspect_err(|error| errors.add("password", error.to_string()))
            .ok()
    });

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = password
        .map(|password| PasswordHash::new(password, PasswordHash::DEFAULT_COST))
        .transpose()?;

    Ok(UserUpdate {
        username,
        email,
        password_hash,
    })
}
