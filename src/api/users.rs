//! Registering, listing and fetching users.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    Email, Error, User, UserID, Username,
    api::{ApiError, ApiState, ApiUser, token::encode_token},
    auth::{check_new_user, register},
    user::{get_all_users, get_user_by_id},
};

/// A user as sent to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBody {
    pub id: UserID,
    pub username: Username,
    pub email: Email,
    /// A fresh API token, only sent after registering or logging in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserBody {
    pub fn new(user: User, token: Option<String>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            token,
        }
    }
}

/// The `{"user": ...}` envelope used by requests and responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

/// The response body for the list of users.
#[derive(Debug, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<UserBody>,
}

/// The details for registering through the API.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Register a user and return them with a token.
pub async fn register_user(
    State(state): State<ApiState>,
    payload: Result<Json<UserEnvelope<RegistrationBody>>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope<UserBody>>), ApiError> {
    let Json(UserEnvelope { user: body }) = payload?;

    let (username, email, password) =
        check_new_user(&body.username, &body.email, &body.password).map_err(ApiError::Validation)?;

    let user = register(username, email, password, &state.db_connection)?;
    tracing::info!("Registered user {} ({}) through the API", user.username, user.id);

    let token = encode_token(user.id, &state.api_token_keys)?;

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            user: UserBody::new(user, Some(token)),
        }),
    ))
}

/// List every user ordered by ID.
pub async fn list_users(
    _: ApiUser,
    State(state): State<ApiState>,
) -> Result<Json<UsersEnvelope>, ApiError> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let users = get_all_users(&connection)?
        .into_iter()
        .map(|user| UserBody::new(user, None))
        .collect();

    Ok(Json(UsersEnvelope { users }))
}

/// Get a single user by ID.
pub async fn get_user(
    _: ApiUser,
    Path(user_id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<UserEnvelope<UserBody>>, ApiError> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserID::new(user_id), &connection)?;

    Ok(Json(UserEnvelope {
        user: UserBody::new(user, None),
    }))
}

#[cfg(test)]
mod users_api_tests {
    use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
    use serde_json::json;

    use crate::{
        api::{
            test_helpers::{get_api_server, get_api_state},
            token::encode_token,
        },
        endpoints::{self, format_endpoint},
        user::{count_users, get_user_by_username, must_create_test_user},
    };

    use super::{UserBody, UserEnvelope, UsersEnvelope};

    const STRONG_PASSWORD: &str = "iamtestingwhethericancreateanewuser";

    #[tokio::test]
    async fn register_returns_created_user_with_token() {
        let state = get_api_state();
        let server = get_api_server(state.clone());

        let response = server
            .post(endpoints::USERS_API)
            .json(&json!({
                "user": {
                    "username": "alice",
                    "email": "Alice@Example.com",
                    "password": STRONG_PASSWORD,
                }
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: UserEnvelope<UserBody> = response.json();
        assert_eq!(body.user.username.as_ref(), "alice");
        assert_eq!(body.user.email.as_ref(), "alice@example.com");
        assert!(body.user.token.is_some());

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_username("alice", &connection).unwrap();
        assert_eq!(user.id, body.user.id);
    }

    #[tokio::test]
    async fn register_reports_field_errors() {
        let state = get_api_state();
        must_create_test_user("alice", "test", &state.db_connection.lock().unwrap());
        let server = get_api_server(state.clone());

        let response = server
            .post(endpoints::USERS_API)
            .json(&json!({ "user": { "username": "alice", "email": "nope" } }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_json(&json!({
            "errors": {
                "email": ["Enter a valid email address."],
                "password": ["This field is required."],
            }
        }));
        assert_eq!(count_users(&state.db_connection.lock().unwrap()), Ok(1));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let state = get_api_state();
        must_create_test_user("alice", "test", &state.db_connection.lock().unwrap());
        let server = get_api_server(state);

        let response = server
            .post(endpoints::USERS_API)
            .json(&json!({
                "user": {
                    "username": "alice",
                    "email": "alice2@example.com",
                    "password": STRONG_PASSWORD,
                }
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_json(&json!({
            "errors": { "username": ["A user with that username already exists."] }
        }));
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let server = get_api_server(get_api_state());

        let response = server
            .post(endpoints::USERS_API)
            .text("{not json")
            .content_type("application/json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_and_get_users_need_a_token() {
        let state = get_api_state();
        let alice = must_create_test_user("alice", "test", &state.db_connection.lock().unwrap());
        must_create_test_user("bob", "test", &state.db_connection.lock().unwrap());
        let token = encode_token(alice.id, &state.api_token_keys).unwrap();
        let authorization = HeaderValue::from_str(&format!("Token {token}")).unwrap();
        let server = get_api_server(state);

        server
            .get(endpoints::USERS_API)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let users: UsersEnvelope = server
            .get(endpoints::USERS_API)
            .add_header(AUTHORIZATION, authorization.clone())
            .await
            .json();
        let usernames: Vec<_> = users
            .users
            .iter()
            .map(|user| user.username.as_ref())
            .collect();
        assert_eq!(usernames, ["alice", "bob"]);
        assert!(users.users.iter().all(|user| user.token.is_none()));

        let response = server
            .get(&format_endpoint(endpoints::USER_API, alice.id.as_i64()))
            .add_header(AUTHORIZATION, authorization.clone())
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "user": { "id": alice.id.as_i64(), "username": "alice", "email": "alice@example.com" }
        }));

        server
            .get(&format_endpoint(endpoints::USER_API, 99))
            .add_header(AUTHORIZATION, authorization)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
