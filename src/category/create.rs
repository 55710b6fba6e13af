//! Category creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, FieldErrors,
    category::{CategoryForm, create_category},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        field_errors, text_input,
    },
    navigation::NavBar,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category creation page.
pub async fn get_create_category_page() -> Response {
    create_category_view(&CategoryForm::default(), &FieldErrors::new()).into_response()
}

/// Handle category creation form submission.
///
/// Redirects to the categories page on success, otherwise shows the form
/// again with the problems next to each field.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Form(form): Form<CategoryForm>,
) -> Response {
    let (name, description) = match form.validate() {
        Ok(values) => values,
        Err(errors) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                create_category_view(&form, &errors),
            )
                .into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_category(name, &description, &connection) {
        Ok(category) => {
            tracing::info!("Created category {} ({})", category.name, category.id);
            Redirect::to(endpoints::CATEGORIES_VIEW).into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            error.into_response()
        }
    }
}

fn create_category_view(form: &CategoryForm, errors: &FieldErrors) -> Markup {
    let nav_bar = NavBar::new(endpoints::CREATE_CATEGORY).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                method="post"
                action=(endpoints::CREATE_CATEGORY)
                class="w-full space-y-4 md:space-y-6"
            {
                (text_input("name", "Category Name", "text", &form.name, errors.get("name")))

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    textarea
                        id="description"
                        name="description"
                        rows="4"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {
                        (form.description)
                    }

                    (field_errors(errors.get("description")))
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Category" }
            }
        }
    };

    base("Create Category", &[], &content)
}

#[cfg(test)]
mod create_category_page_tests {
    use axum::http::StatusCode;

    use crate::{
        category::get_create_category_page,
        endpoints,
        test_utils::{
            assert_form_action, assert_form_input, assert_form_submit_button, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_page() {
        let response = get_create_category_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .expect("content-type header missing"),
            "text/html; charset=utf-8"
        );

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_form_action(&form, endpoints::CREATE_CATEGORY);
        assert_form_input(&form, "name", "text");
        assert_form_submit_button(&form);
    }
}

#[cfg(test)]
mod create_category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        category::{
            CategoryForm, CategoryName, create::CreateCategoryState, create_category_endpoint,
            get_all_categories,
        },
        db::initialize,
        endpoints,
        test_utils::{
            assert_field_error, assert_redirect, assert_valid_html, must_get_form,
            parse_html_document,
        },
    };

    fn get_state() -> CreateCategoryState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        CreateCategoryState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn can_create_category() {
        let state = get_state();
        let form = CategoryForm {
            name: "Kitchen".to_owned(),
            description: "Pots and pans".to_owned(),
        };

        let response = create_category_endpoint(State(state.clone()), Form(form)).await;

        assert_redirect(&response, endpoints::CATEGORIES_VIEW);
        let categories = get_all_categories(&state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, CategoryName::new_unchecked("Kitchen"));
        assert_eq!(categories[0].description, "Pots and pans");
    }

    #[tokio::test]
    async fn blank_name_shows_error() {
        let state = get_state();
        let form = CategoryForm {
            name: "   ".to_owned(),
            description: String::new(),
        };

        let response = create_category_endpoint(State(state.clone()), Form(form)).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_field_error(&must_get_form(&html), "name", "This field is required.");
        let categories = get_all_categories(&state.db_connection.lock().unwrap()).unwrap();
        assert!(categories.is_empty());
    }
}
