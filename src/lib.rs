//! Storefront is a small web shop catalog.
//!
//! Products can be listed, filtered by category, price, name and rating,
//! and rated by visitors. Users can register and log in to manage the
//! catalog.
//!
//! This library serves HTML pages directly and provides a JSON REST API for
//! user accounts.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod api;
mod app_state;
mod auth;
mod category;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod password;
mod product;
mod routing;
mod timezone;
mod user;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use category::{Category, CategoryId, CategoryName, create_category};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use product::{NewProduct, Price, Product, ProductId, create_product};
pub use routing::build_router;
pub use user::{Email, NewUser, User, UserID, Username, create_user, get_user_by_id};
pub use validation::FieldErrors;

use crate::{
    category::CATEGORY_IN_USE_ERROR_MSG, html::error_view,
    internal_server_error::InternalServerError, not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password pair did not match a registered user.
    ///
    /// The same error is used for unknown usernames and wrong passwords so
    /// that clients cannot tell which one was wrong.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The auth cookie is missing from the cookie jar, could not be decoded
    /// or has expired.
    #[error("no valid auth cookie in the cookie jar")]
    CookieMissing,

    /// There was an error formatting or computing the expiry date time of an
    /// auth cookie.
    #[error("could not compute or format the auth cookie expiry")]
    DateError,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A form or API payload failed validation.
    #[error("the submitted data is invalid: {0}")]
    Validation(FieldErrors),

    /// A catalog filter query parameter could not be parsed.
    #[error("invalid value \"{value}\" for the filter \"{field}\"")]
    InvalidFilter {
        /// The query parameter name.
        field: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// A rating score was not an integer on the voting scale.
    #[error("\"{0}\" is not a valid score")]
    InvalidScore(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a category that still has products.
    #[error("the category still has {0} product(s)")]
    CategoryInUse(u32),

    /// The category ID used to create a product did not match a category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory,

    /// The username is already taken by another user.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The multipart form could not be read.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// An uploaded image could not be written to the media directory.
    #[error("could not store the uploaded image: {0}")]
    ImageStorageError(String),

    /// An API token could not be created.
    #[error("could not create an API token: {0}")]
    TokenError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidFilter { field, value } => (
                StatusCode::BAD_REQUEST,
                error_view(
                    "Bad Request",
                    "400",
                    "Invalid filter",
                    &format!("\"{value}\" is not a valid value for {field}. Use a number instead."),
                ),
            )
                .into_response(),
            Error::InvalidScore(score) => (
                StatusCode::BAD_REQUEST,
                error_view(
                    "Bad Request",
                    "400",
                    "Invalid score",
                    &format!("\"{score}\" is not a valid score. Pick a whole number from 1 to 5."),
                ),
            )
                .into_response(),
            Error::MultipartError(_) => (
                StatusCode::BAD_REQUEST,
                error_view(
                    "Bad Request",
                    "400",
                    "Could not read the form",
                    "The upload may have been interrupted. Try submitting the form again.",
                ),
            )
                .into_response(),
            Error::CategoryInUse(product_count) => (
                StatusCode::CONFLICT,
                error_view(
                    "Conflict",
                    "409",
                    CATEGORY_IN_USE_ERROR_MSG,
                    &format!(
                        "The category still has {product_count} product(s). \
                        Move or remove them before deleting the category."
                    ),
                ),
            )
                .into_response(),
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                error_view(
                    "Unauthorized",
                    "401",
                    "Invalid username or password.",
                    "Check your details and try again.",
                ),
            )
                .into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn error_status_codes() {
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (
                Error::InvalidFilter {
                    field: "max_price",
                    value: "abc".to_owned(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (Error::InvalidScore("9".to_owned()), StatusCode::BAD_REQUEST),
            (Error::CategoryInUse(2), StatusCode::CONFLICT),
            (Error::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (Error::DatabaseLockError, StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::HashingError("boom".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, want_status) in cases {
            let description = error.to_string();
            let response = error.into_response();

            assert_eq!(
                response.status(),
                want_status,
                "got status {} for error \"{description}\", want {want_status}",
                response.status()
            );
        }
    }
}
