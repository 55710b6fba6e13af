//! The JSON REST API for user accounts.
//!
//! Requests and responses wrap the user in an envelope, e.g. `{"user": {...}}`.
//! Clients authenticate with `Authorization: Token <jwt>`, where the token
//! comes from the log-in endpoint.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;

use crate::AppState;

mod current_user;
mod error;
mod log_in;
mod token;
mod users;

pub use current_user::{get_current_user, update_current_user};
pub use error::ApiError;
pub use log_in::log_in;
pub use token::ApiUser;
pub use users::{get_user, list_users, register_user};

/// The keys for signing and checking API tokens.
#[derive(Clone)]
pub struct ApiTokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl ApiTokenKeys {
    /// Create the HMAC keys from `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// The state needed by the API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub api_token_keys: ApiTokenKeys,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            api_token_keys: state.api_token_keys.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<ApiState> for ApiTokenKeys {
    fn from_ref(state: &ApiState) -> Self {
        state.api_token_keys.clone()
    }
}
