//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState, api,
    auth::{
        auth_guard, get_log_in_page, get_me_page, get_register_page, get_users_page, log_out,
        post_log_in, register_user,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_create_category_page,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    product::{
        create_product_endpoint, get_create_product_page, get_product_page, get_products_page,
        rate_product_endpoint,
    },
};

/// The largest request body accepted, which bounds the size of product images.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_products_page))
        .route(endpoints::PRODUCT_VIEW, get(get_product_page))
        .route(endpoints::RATE_PRODUCT, post(rate_product_endpoint))
        .route(
            endpoints::LOG_IN_VIEW,
            get(get_log_in_page).post(post_log_in),
        )
        .route(endpoints::LOG_OUT, get(log_out).post(log_out))
        .route(
            endpoints::REGISTER_VIEW,
            get(get_register_page).post(register_user),
        )
        .route(endpoints::ME_VIEW, get(get_me_page))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(
            endpoints::CREATE_PRODUCT,
            get(get_create_product_page).post(create_product_endpoint),
        )
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(
            endpoints::CREATE_CATEGORY,
            get(get_create_category_page).post(create_category_endpoint),
        )
        .route(endpoints::DELETE_CATEGORY, post(delete_category_endpoint))
        .route(endpoints::ALL_USERS_VIEW, get(get_users_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let api_routes = Router::new()
        .route(
            endpoints::USERS_API,
            get(api::list_users).post(api::register_user),
        )
        .route(endpoints::USER_API, get(api::get_user))
        .route(endpoints::USERS_LOG_IN_API, post(api::log_in))
        .route(
            endpoints::CURRENT_USER_API,
            get(api::get_current_user)
                .put(api::update_current_user)
                .patch(api::update_current_user),
        );

    let media_root = state.media_root.clone();

    protected_routes
        .merge(unprotected_routes)
        .merge(api_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .nest_service(endpoints::MEDIA, ServeDir::new(media_root))
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}
