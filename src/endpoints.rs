//! The endpoint URIs for pages and the REST API.
//!
//! For endpoints that take a parameter, e.g., '/product/{product_id}/', use [format_endpoint].

/// The product list with the catalog filters.
pub const ROOT: &str = "/";
/// The page for a single product.
pub const PRODUCT_VIEW: &str = "/product/{product_id}/";
/// The page and form target for creating a product.
pub const CREATE_PRODUCT: &str = "/product/create/";
/// The form target for rating a product.
pub const RATE_PRODUCT: &str = "/product/{product_id}/rate/";
/// The page for listing categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The page and form target for creating a category.
pub const CREATE_CATEGORY: &str = "/category/create/";
/// The form target for deleting a category.
pub const DELETE_CATEGORY: &str = "/category/{category_id}/delete/";
/// The page and form target for registering a user.
pub const REGISTER_VIEW: &str = "/register";
/// The page and form target for logging in.
pub const LOG_IN_VIEW: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
/// The page that shows the logged in user.
pub const ME_VIEW: &str = "/me";
/// The page listing all registered users.
pub const ALL_USERS_VIEW: &str = "/all_users";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";
/// The route for uploaded files.
pub const MEDIA: &str = "/media";

/// The REST route for listing and registering users.
pub const USERS_API: &str = "/users/";
/// The REST route for a single user.
pub const USER_API: &str = "/users/{user_id}/";
/// The REST route for logging in.
pub const USERS_LOG_IN_API: &str = "/users/login/";
/// The REST route for the user owning the request token.
pub const CURRENT_USER_API: &str = "/user";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/product/{product_id}/', '{product_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
