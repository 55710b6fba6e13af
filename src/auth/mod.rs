//! Cookie sessions for the HTML pages and the pages for logging in and out.

mod cookie;
mod current_user;
mod log_in;
mod log_out;
mod me;
mod middleware;
mod redirect;
mod register_user;
mod token;
mod users_page;

pub use cookie::{
    COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, REMEMBER_ME_COOKIE_DURATION, invalidate_auth_cookie,
    set_auth_cookie,
};
pub use current_user::CurrentUser;
pub use log_in::{get_log_in_page, post_log_in};
pub(crate) use log_in::{INVALID_CREDENTIALS_ERROR_MSG, authenticate};
pub use log_out::log_out;
pub use me::get_me_page;
pub use middleware::{AuthState, auth_guard};
pub(crate) use register_user::{DUPLICATE_USERNAME_ERROR_MSG, check_new_user, register};
pub use register_user::{get_register_page, register_user};
pub use users_page::get_users_page;
