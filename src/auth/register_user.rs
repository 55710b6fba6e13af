//! The registration page for creating a user account.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error, FieldErrors, PasswordHash, User, ValidatedPassword,
    app_state::create_cookie_key,
    auth::cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, base, link, log_in_register, password_input, text_input},
    user::{Email, NewUser, Username, create_user},
};

/// The message shown when the username is already registered.
pub const DUPLICATE_USERNAME_ERROR_MSG: &str = "A user with that username already exists.";

/// Check the details for a new account.
///
/// The password is checked against the username and email too, since a
/// password built from them is easy to guess.
///
/// # Errors
///
/// Returns the messages for every field that is invalid.
pub fn check_new_user(
    raw_username: &str,
    raw_email: &str,
    raw_password: &str,
) -> Result<(Username, Email, ValidatedPassword), FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = Username::new(raw_username)
        .inspect_err(|message| errors.add("username", message.clone()))
        .ok();
    let email = Email::new(raw_email)
        .inspect_err(|message| errors.add("email", message.clone()))
        .ok();

    let password = if raw_password.is_empty() {
        errors.add("password", "This field is required.");
        None
    } else {
        ValidatedPassword::new(raw_password, &[raw_username.trim(), raw_email.trim()])
            .inspect_err(|error| errors.add("password", error.to_string()))
            .ok()
    };

    match (username, email, password) {
        (Some(username), Some(email), Some(password)) if errors.is_empty() => {
            Ok((username, email, password))
        }
        _ => Err(errors),
    }
}

/// Hash the password and insert the user.
///
/// # Errors
///
/// Returns [Error::DuplicateUsername] if the username is taken, or
/// [Error::HashingError] if the password could not be hashed.
pub fn register(
    username: Username,
    email: Email,
    password: ValidatedPassword,
    db_connection: &Mutex<Connection>,
) -> Result<User, Error> {
    // Hash before taking the lock, bcrypt is slow on purpose.
    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;

    let connection = db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    create_user(
        NewUser {
            username,
            email,
            password_hash,
        },
        &connection,
    )
}

fn registration_form(form: &RegisterForm, errors: &FieldErrors) -> Markup {
    html! {
        form
            method="post"
            action=(endpoints::REGISTER_VIEW)
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", &form.username, errors.get("username")))

            (text_input("email", "Email", "email", &form.email, errors.get("email")))

            (password_input("password", "Password", errors.get("password")))

            (password_input("confirm_password", "Confirm Password", errors.get("confirm_password")))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

fn registration_page(form: &RegisterForm, errors: &FieldErrors) -> Markup {
    let form = registration_form(form, errors);
    let content = log_in_register("Create an account", &form);

    base("Register", &[], &content)
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    registration_page(&RegisterForm::default(), &FieldErrors::new()).into_response()
}

/// The state needed for creating a new user.
#[derive(Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl RegistrationState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw registration form fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Create a user from the registration form and log them in.
///
/// Redirects to the product list on success, otherwise shows the form again
/// with the problems next to each field.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let checked = check_new_user(&user_data.username, &user_data.email, &user_data.password);

    let (username, email, password) = match checked {
        Ok(values) if user_data.password == user_data.confirm_password => values,
        result => {
            let mut errors = result.err().unwrap_or_default();
            if user_data.password != user_data.confirm_password {
                errors.add("confirm_password", "Passwords do not match.");
            }

            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                registration_page(&user_data, &errors),
            )
                .into_response();
        }
    };

    let user = match register(username, email, password, &state.db_connection) {
        Ok(user) => user,
        Err(Error::DuplicateUsername) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                registration_page(
                    &user_data,
                    &FieldErrors::single("username", DUPLICATE_USERNAME_ERROR_MSG),
                ),
            )
                .into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            return error.into_response();
        }
    };

    tracing::info!("Registered user {} ({})", user.username, user.id);

    match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => (jar, Redirect::to(endpoints::ROOT)).into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");
            error.into_response()
        }
    }
}
