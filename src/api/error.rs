//! Errors returned as JSON by the REST API.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    Error, FieldErrors,
    auth::{DUPLICATE_USERNAME_ERROR_MSG, INVALID_CREDENTIALS_ERROR_MSG},
};

/// The message for requests without an `Authorization` header.
pub const NO_CREDENTIALS_MSG: &str = "Authentication credentials were not provided.";
/// The message for a token that is malformed, forged or expired.
pub const INVALID_TOKEN_MSG: &str = "Invalid or expired token.";

/// An error response from the REST API.
///
/// Every variant is rendered as `{"errors": {"<field>": ["<message>", ...]}}`,
/// with the field "detail" for errors that do not belong to a field.
#[derive(Debug, PartialEq)]
pub enum ApiError {
    /// The payload failed validation (422).
    Validation(FieldErrors),
    /// The body could not be read as JSON of the right shape (400).
    BadRequest(String),
    /// The client is not authenticated or gave the wrong credentials (401).
    Unauthorized(&'static str),
    /// The requested resource does not exist (404).
    NotFound,
    /// Something went wrong on the server, the details are only logged (500).
    Internal,
}

fn detail(message: &str) -> serde_json::Value {
    json!({ "errors": { "detail": [message] } })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(detail(&message))).into_response()
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(detail(message))).into_response()
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, Json(detail("Not found."))).into_response(),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(detail("An internal error occurred. Please try again later.")),
            )
                .into_response(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::Validation(errors) => ApiError::Validation(errors),
            Error::TooWeak(_) => {
                ApiError::Validation(FieldErrors::single("password", error.to_string()))
            }
            Error::DuplicateUsername => {
                ApiError::Validation(FieldErrors::single("username", DUPLICATE_USERNAME_ERROR_MSG))
            }
            Error::InvalidCredentials => ApiError::Unauthorized(INVALID_CREDENTIALS_ERROR_MSG),
            Error::NotFound => ApiError::NotFound,
            error => {
                tracing::error!("An unexpected error occurred in the API: {error}");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
