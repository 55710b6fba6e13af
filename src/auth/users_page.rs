//! The page listing every registered user.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::macros::format_description;

use crate::{
    AppState, Error, User,
    endpoints,
    html::{PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base},
    navigation::NavBar,
    user::get_all_users,
};

/// The state needed for the users page.
#[derive(Debug, Clone)]
pub struct UsersPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UsersPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render a table of all users ordered by ID.
pub async fn get_users_page(State(state): State<UsersPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let users = get_all_users(&connection)
        .inspect_err(|error| tracing::error!("Could not get users: {error}"))?;

    Ok(users_view(&users).into_response())
}

fn users_view(users: &[User]) -> Markup {
    let nav_bar = NavBar::new(endpoints::ALL_USERS_VIEW).into_html();
    let date_format = format_description!("[year]-[month]-[day]");

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-4xl space-y-4"
            {
                h1 class="text-xl font-bold" { "Users" }

                table class="w-full text-sm text-left"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Username" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Joined" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Active" }
                        }
                    }

                    tbody
                    {
                        @for user in users {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (user.username) }
                                td class=(TABLE_CELL_STYLE) { (user.email) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (user.date_joined.format(date_format).unwrap_or_default())
                                }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @if user.is_active { "Yes" } @else { "No" }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Users", &[], &content)
}
