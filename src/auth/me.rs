//! The page showing who is logged in.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use maud::{Markup, html};
use rusqlite::Connection;
use time::macros::format_description;

use crate::{
    AppState, Error, User,
    auth::CurrentUser,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, base, link},
    navigation::NavBar,
    user::get_user_by_id,
};

/// The state needed for the account page.
#[derive(Clone)]
pub struct MeState {
    pub cookie_key: Key,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for MeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<MeState> for Key {
    fn from_ref(state: &MeState) -> Self {
        state.cookie_key.clone()
    }
}

/// Render the logged in user's details, or an invitation to log in.
///
/// A session for a user that no longer exists is shown as anonymous.
pub async fn get_me_page(
    State(state): State<MeState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Response, Error> {
    let user = match user_id {
        Some(user_id) => {
            let connection = state
                .db_connection
                .lock()
                .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
                .map_err(|_| Error::DatabaseLockError)?;

            match get_user_by_id(user_id, &connection) {
                Ok(user) => Some(user),
                Err(Error::NotFound) => {
                    tracing::warn!("Session refers to missing user {user_id}");
                    None
                }
                Err(error) => return Err(error),
            }
        }
        None => None,
    };

    Ok(me_view(user.as_ref()).into_response())
}

fn me_view(user: Option<&User>) -> Markup {
    let nav_bar = NavBar::new(endpoints::ME_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-md space-y-4"
            {
                @match user {
                    Some(user) => {
                        @let joined = user
                            .date_joined
                            .format(format_description!("[year]-[month]-[day]"))
                            .unwrap_or_default();

                        h1 class="text-2xl font-bold" { "Hello, " (user.username) }

                        dl class="grid grid-cols-2 gap-2"
                        {
                            dt class="font-semibold" { "Username" }
                            dd id="username" { (user.username) }

                            dt class="font-semibold" { "Email" }
                            dd id="email" { (user.email) }

                            dt class="font-semibold" { "Joined" }
                            dd { (joined) }
                        }

                        form method="post" action=(endpoints::LOG_OUT)
                        {
                            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Log out" }
                        }
                    }
                    None => {
                        h1 class="text-2xl font-bold" { "You are not logged in" }

                        p
                        {
                            (link(endpoints::LOG_IN_VIEW, "Log in"))
                            " or "
                            (link(endpoints::REGISTER_VIEW, "create an account"))
                            " to manage the catalog."
                        }
                    }
                }
            }
        }
    );

    base("My Account", &[], &content)
}

#[cfg(test)]
mod me_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::Html;

    use crate::{
        UserID,
        app_state::create_cookie_key,
        auth::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, set_auth_cookie},
        db::initialize,
        endpoints,
        test_utils::{assert_form_action, assert_valid_html, must_get_form, select_texts},
        user::must_create_test_user,
    };

    use super::{MeState, get_me_page};

    fn get_state() -> MeState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        MeState {
            cookie_key: create_cookie_key("me"),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn get_test_server(state: MeState) -> TestServer {
        let app = Router::new()
            .route(endpoints::ME_VIEW, get(get_me_page))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn session_cookie(state: &MeState, user_id: UserID) -> Cookie<'static> {
        let jar = set_auth_cookie(
            PrivateCookieJar::new(state.cookie_key.clone()),
            user_id,
            DEFAULT_COOKIE_DURATION,
        )
        .unwrap();

        // The jar only hands out decrypted cookies, so the encrypted value is
        // taken from the response headers.
        let response = jar.into_response();
        let header = response
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();

        let cookie = Cookie::parse(header).unwrap();
        assert_eq!(cookie.name(), COOKIE_TOKEN);
        cookie
    }

    #[tokio::test]
    async fn anonymous_visitor_sees_log_in_link() {
        let server = get_test_server(get_state());

        let response = server.get(endpoints::ME_VIEW).await;

        response.assert_status(StatusCode::OK);
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        assert_eq!(select_texts(&html, "h1"), ["You are not logged in"]);
        let links = select_texts(&html, "main a");
        assert_eq!(links, ["Log in", "create an account"]);
    }

    #[tokio::test]
    async fn logged_in_user_sees_details_and_log_out_button() {
        let state = get_state();
        let user = must_create_test_user("alice", "test", &state.db_connection.lock().unwrap());
        let cookie = session_cookie(&state, user.id);
        let server = get_test_server(state);

        let response = server.get(endpoints::ME_VIEW).add_cookie(cookie).await;

        response.assert_status(StatusCode::OK);
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        assert_eq!(select_texts(&html, "#username"), ["alice"]);
        assert_eq!(select_texts(&html, "#email"), ["alice@example.com"]);
        assert_form_action(&must_get_form(&html), endpoints::LOG_OUT);
    }

    #[tokio::test]
    async fn session_for_missing_user_is_anonymous() {
        let state = get_state();
        let cookie = session_cookie(&state, UserID::new(99));
        let server = get_test_server(state);

        let response = server.get(endpoints::ME_VIEW).add_cookie(cookie).await;

        response.assert_status(StatusCode::OK);
        let html = Html::parse_document(&response.text());
        assert_eq!(select_texts(&html, "h1"), ["You are not logged in"]);
    }
}
