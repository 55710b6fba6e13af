//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, sync::OnceLock};

use regex::Regex;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The longest username that may be registered.
pub const USERNAME_MAX_LENGTH: usize = 150;

/// A username made of letters, digits and `@.+-_`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Username(String);

impl Username {
    /// Validate a username.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for showing next to the form field if the
    /// username is empty, too long or contains other characters.
    pub fn new(raw_username: &str) -> Result<Self, String> {
        static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = USERNAME_REGEX
            .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

        let username = raw_username.trim();

        if username.is_empty() {
            return Err("This field is required.".to_owned());
        }

        if username.chars().count() > USERNAME_MAX_LENGTH {
            return Err(format!(
                "Ensure this value has at most {USERNAME_MAX_LENGTH} characters."
            ));
        }

        if !regex.is_match(username) {
            return Err(
                "Enter a valid username. This value may contain only letters, numbers, \
                and @/./+/-/_ characters."
                    .to_owned(),
            );
        }

        Ok(Self(username.to_owned()))
    }

    /// Create a username without validation.
    ///
    /// The caller should ensure the username came from the database or was validated before.
    pub fn new_unchecked(raw_username: &str) -> Self {
        Self(raw_username.to_owned())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lower-cased email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// The address is trimmed and lower-cased, so `KorneyB@GMail.com` is stored
    /// as `korneyb@gmail.com`.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for showing next to the form field if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, String> {
        static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = EMAIL_REGEX.get_or_init(|| {
            Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$")
                .expect("Failed to compile email regex")
        });

        let email = raw_email.trim().to_lowercase();

        if email.is_empty() {
            return Err("This field is required.".to_owned());
        }

        if email.len() > 254 || !regex.is_match(&email) {
            return Err("Enter a valid email address.".to_owned());
        }

        Ok(Self(email))
    }

    /// Create a new `Email` without any validation.
    ///
    /// For emails coming from the user (e.g., via the REST API), this function should **not** be used, instead use the checked version.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The unique name the user logs in with.
    pub username: Username,
    /// The user's email address.
    pub email: Email,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// When the user registered.
    pub date_joined: OffsetDateTime,
    /// Whether the user may log in.
    pub is_active: bool,
}

/// The validated data needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The unique name the user logs in with.
    pub username: Username,
    /// The user's email address.
    pub email: Email,
    /// The user's password hash, the plain text password is never stored.
    pub password_hash: PasswordHash,
}

/// The fields of a user that may be changed, `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<Username>,
    pub email: Option<Email>,
    pub password_hash: Option<PasswordHash>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                password TEXT NOT NULL,
                date_joined TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateUsername] if the username is already taken,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let now = OffsetDateTime::now_utc();
    let date_joined = now.replace_nanosecond(0).unwrap_or(now);

    connection.execute(
        "INSERT INTO user (username, email, password, date_joined) VALUES (?1, ?2, ?3, ?4)",
        (
            new_user.username.as_ref(),
            new_user.email.as_ref(),
            new_user.password_hash.as_ref(),
            date_joined,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        date_joined,
        is_active: true,
    })
}

const USER_COLUMNS: &str = "id, username, email, password, date_joined, is_active";

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the user with the username `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the username.
pub fn get_user_by_username(username: &str, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE username = :username"
        ))?
        .query_row(&[(":username", &username)], map_row)
        .map_err(|error| error.into())
}

/// Get all users ordered by ID.
pub fn get_all_users(db_connection: &Connection) -> Result<Vec<User>, Error> {
    db_connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user ORDER BY id ASC"))?
        .query_map([], map_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Apply `update` to the user with the ID `user_id` and return the updated user.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::DuplicateUsername] if the new username is already taken.
pub fn update_user(
    user_id: UserID,
    update: UserUpdate,
    db_connection: &Connection,
) -> Result<User, Error> {
    let user = get_user_by_id(user_id, db_connection)?;

    let user = User {
        username: update.username.unwrap_or(user.username),
        email: update.email.unwrap_or(user.email),
        password_hash: update.password_hash.unwrap_or(user.password_hash),
        ..user
    };

    db_connection.execute(
        "UPDATE user SET username = ?1, email = ?2, password = ?3 WHERE id = ?4",
        (
            user.username.as_ref(),
            user.email.as_ref(),
            user.password_hash.as_ref(),
            user.id.as_i64(),
        ),
    )?;

    Ok(user)
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_username: String = row.get(1)?;
    let raw_email: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: Username::new_unchecked(&raw_username),
        email: Email::new_unchecked(&raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        date_joined: row.get(4)?,
        is_active: row.get(5)?,
    })
}

#[cfg(test)]
pub(crate) fn must_create_test_user(username: &str, password: &str, connection: &Connection) -> User {
    create_user(
        NewUser {
            username: Username::new_unchecked(username),
            email: Email::new_unchecked(&format!("{username}@example.com")),
            password_hash: PasswordHash::new(crate::ValidatedPassword::new_unchecked(password), 4)
                .expect("Could not hash test password"),
        },
        connection,
    )
    .expect("Could not create test user")
}


#[cfg(test)]
mod email_tests {
    use super::Email;

    #[test]
    fn create_email_lowercases() {
        let email = Email::new(" KorneYBuRAU@GMail.com ");

        assert_eq!(email, Ok(Email::new_unchecked("korneyburau@gmail.com")));
    }

    #[test]
    fn create_email_fails_with_no_at_symbol() {
        assert!(Email::new("foobar.baz").is_err());
    }

    #[test]
    fn create_email_fails_with_empty_string() {
        assert_eq!(Email::new(""), Err("This field is required.".to_owned()));
    }
}
