//! Product creation page and endpoint.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error, FieldErrors,
    category::{Category, get_all_categories, get_category},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        dollar_input_styles, field_errors, text_input,
    },
    navigation::NavBar,
    product::{
        NewProduct, Product, create_product,
        form::{ProductForm, ValidProductForm},
        image::{remove_image, store_image},
    },
    timezone::get_local_offset,
};

const INVALID_CATEGORY_MSG: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// The state needed for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The directory uploaded images are written to.
    pub media_root: PathBuf,
}

impl FromRef<AppState> for CreateProductState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            media_root: state.media_root.clone(),
        }
    }
}

/// Render the product creation page.
pub async fn get_create_product_page(
    State(state): State<CreateProductState>,
) -> Result<Response, Error> {
    let categories = load_categories(&state)?;

    Ok(create_product_view(&ProductForm::default(), &categories, &FieldErrors::new()).into_response())
}

/// Handle the multipart product creation form.
///
/// The image is only written once the rest of the form is valid. Redirects
/// back to an empty form on success.
pub async fn create_product_endpoint(
    State(state): State<CreateProductState>,
    multipart: Multipart,
) -> Response {
    let form = match ProductForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(error) => return error.into_response(),
    };

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let valid_form = match validate(&form, local_offset, &state) {
        Ok(Ok(valid_form)) => valid_form,
        Ok(Err(errors)) => return render_invalid_form(&form, &errors, &state),
        Err(error) => return error.into_response(),
    };

    match save_product(valid_form, local_offset, &state).await {
        Ok(product) => {
            tracing::info!("Created product {} ({})", product.name, product.id);
            Redirect::to(endpoints::CREATE_PRODUCT).into_response()
        }
        // The category was deleted after the form was checked.
        Err(Error::InvalidCategory) => render_invalid_form(
            &form,
            &FieldErrors::single("category", INVALID_CATEGORY_MSG),
            &state,
        ),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a product: {error}");
            error.into_response()
        }
    }
}

/// Check the form fields and that the chosen category exists.
///
/// The outer error is for failures that are not the user's fault.
fn validate(
    form: &ProductForm,
    local_offset: UtcOffset,
    state: &CreateProductState,
) -> Result<Result<ValidProductForm, FieldErrors>, Error> {
    let valid_form = match form.validate(local_offset) {
        Ok(valid_form) => valid_form,
        Err(errors) => return Ok(Err(errors)),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    match get_category(valid_form.category_id, &connection) {
        Ok(_) => Ok(Ok(valid_form)),
        Err(Error::NotFound) => Ok(Err(FieldErrors::single("category", INVALID_CATEGORY_MSG))),
        Err(error) => {
            tracing::error!("Could not check the product category: {error}");
            Err(error)
        }
    }
}

/// Write the image and then the product row.
///
/// The image is removed again if the product could not be saved, so no file
/// is left without a product.
async fn save_product(
    valid_form: ValidProductForm,
    local_offset: UtcOffset,
    state: &CreateProductState,
) -> Result<Product, Error> {
    // The database lock must not be held while the image is written.
    let upload_date = OffsetDateTime::now_utc().to_offset(local_offset).date();
    let image_path = store_image(&state.media_root, &valid_form.image, upload_date).await?;

    let new_product = NewProduct {
        category_id: valid_form.category_id,
        name: valid_form.name,
        price: valid_form.price,
        created: valid_form.created,
        available: valid_form.available,
        description: valid_form.description,
        image: Some(image_path.clone()),
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => create_product(new_product, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    if result.is_err() {
        remove_image(&state.media_root, &image_path).await;
    }

    result
}

fn render_invalid_form(
    form: &ProductForm,
    errors: &FieldErrors,
    state: &CreateProductState,
) -> Response {
    match load_categories(state) {
        Ok(categories) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            create_product_view(form, &categories, errors),
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

fn load_categories(state: &CreateProductState) -> Result<Vec<Category>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))
}

fn create_product_view(form: &ProductForm, categories: &[Category], errors: &FieldErrors) -> Markup {
    let nav_bar = NavBar::new(endpoints::CREATE_PRODUCT).into_html();
    let selected_category = form.category.trim();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                method="post"
                action=(endpoints::CREATE_PRODUCT)
                enctype="multipart/form-data"
                class="w-full space-y-4 md:space-y-6"
            {
                (text_input("name", "Name", "text", &form.name, errors.get("name")))

                div
                {
                    label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                    select id="category" name="category" class=(FORM_TEXT_INPUT_STYLE) required
                    {
                        option value="" { "Select a category" }

                        @for category in categories {
                            @let value = category.id.to_string();
                            option value=(value) selected[value == selected_category]
                            {
                                (category.name)
                            }
                        }
                    }

                    (field_errors(errors.get("category")))
                }

                div
                {
                    label for="price" class=(FORM_LABEL_STYLE) { "Price" }

                    div class="input-wrapper"
                    {
                        input
                            type="number"
                            id="price"
                            name="price"
                            min="1"
                            step="0.01"
                            placeholder="0.00"
                            value=(form.price)
                            class=(FORM_TEXT_INPUT_STYLE)
                            required;
                    }

                    (field_errors(errors.get("price")))
                }

                (text_input("created", "Created", "datetime-local", &form.created, errors.get("created")))

                div
                {
                    div class="flex items-center gap-2"
                    {
                        input
                            type="checkbox"
                            id="available"
                            name="available"
                            checked[form.available]
                            required;

                        label for="available" class=(FORM_LABEL_STYLE) { "Available" }
                    }

                    (field_errors(errors.get("available")))
                }

                div
                {
                    label for="image" class=(FORM_LABEL_STYLE) { "Image" }

                    input
                        type="file"
                        id="image"
                        name="image"
                        accept="image/*"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;

                    (field_errors(errors.get("image")))
                }

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

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Product" }
            }
        }
    };

    base("Create Product", &[dollar_input_styles()], &content)
}


#[cfg(test)]
mod create_product_endpoint_tests {
    use std::{
        path::Path,
        sync::{
            Arc, Mutex,
            atomic::{AtomicU32, Ordering},
        },
    };

    use axum::{
        body::Bytes,
        extract::{FromRequest, Multipart, State},
        http::{Request, StatusCode},
    };
    use rusqlite::Connection;
    use time::{UtcOffset, macros::datetime};

    use crate::{
        Error,
        category::{CategoryId, CategoryName, create_category, delete_category},
        db::initialize,
        endpoints,
        product::{
            Price, ProductFilter,
            form::{UploadedImage, ValidProductForm},
            get_products,
        },
        test_utils::{
            assert_field_error, assert_redirect, assert_valid_html, must_get_form,
            parse_html_document,
        },
    };

    use super::{CreateProductState, create_product_endpoint, save_product};

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn get_state() -> (CreateProductState, CategoryId) {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let category =
            create_category(CategoryName::new_unchecked("Kitchen"), "", &connection).unwrap();

        let media_root = std::env::temp_dir().join(format!(
            "storefront-create-product-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        (
            CreateProductState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/GMT-5".to_owned(),
                media_root,
            },
            category.id,
        )
    }

    async fn must_make_multipart(fields: &[(&str, &str)], image: Option<(&str, &str)>) -> Multipart {
        let boundary = "MY_BOUNDARY123456789";
        let mut data: Vec<u8> = Vec::new();

        for (name, value) in fields {
            data.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            data.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            data.extend_from_slice(value.as_bytes());
            data.extend_from_slice(b"\r\n");
        }

        if let Some((file_name, content_type)) = image {
            data.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            data.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n\
                    Content-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            data.extend_from_slice(PNG_BYTES);
            data.extend_from_slice(b"\r\n");
        }

        data.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(endpoints::CREATE_PRODUCT)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(data.into())
            .unwrap();

        Multipart::from_request(request, &{}).await.unwrap()
    }

    #[tokio::test]
    async fn can_create_product() {
        let (state, category_id) = get_state();
        let category = category_id.to_string();
        let multipart = must_make_multipart(
            &[
                ("name", "Kettle"),
                ("category", &category),
                ("price", "49.99"),
                ("created", "2025-03-01T09:30"),
                ("available", "on"),
                ("description", "Boils water"),
            ],
            Some(("kettle.png", "image/png")),
        )
        .await;

        let response = create_product_endpoint(State(state.clone()), multipart).await;

        assert_redirect(&response, endpoints::CREATE_PRODUCT);

        let products =
            get_products(&ProductFilter::default(), &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert_eq!(product.name, "Kettle");
        assert_eq!(product.category_id, category_id);
        assert_eq!(product.price, Price::from_cents(4_999));
        // "Etc/GMT-5" is a fixed offset of five hours ahead of UTC.
        assert_eq!(product.created, datetime!(2025-03-01 09:30 +5));
        assert!(product.available);
        assert_eq!(product.rating_votes, 0);

        let image = product.image.as_deref().expect("want image path");
        assert!(image.starts_with("products/"), "got image path {image}");
        assert!(image.ends_with("/kettle.png"), "got image path {image}");
        assert_eq!(std::fs::read(state.media_root.join(image)).unwrap(), PNG_BYTES);

        std::fs::remove_dir_all(&state.media_root).unwrap();
    }

    #[tokio::test]
    async fn invalid_form_shows_errors_and_writes_nothing() {
        let (state, category_id) = get_state();
        let category = category_id.to_string();
        let multipart = must_make_multipart(
            &[
                ("name", " "),
                ("category", &category),
                ("price", "0.50"),
                ("created", "2025-03-01T09:30"),
            ],
            Some(("kettle.png", "image/png")),
        )
        .await;

        let response = create_product_endpoint(State(state.clone()), multipart).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_field_error(&form, "name", "This field is required.");
        assert_field_error(
            &form,
            "price",
            "Ensure this value is greater than or equal to 1.",
        );
        assert_field_error(&form, "available", "This field is required.");

        let products =
            get_products(&ProductFilter::default(), &state.db_connection.lock().unwrap()).unwrap();
        assert!(products.is_empty());
        assert!(!state.media_root.exists());
    }

    #[tokio::test]
    async fn unknown_category_is_a_field_error() {
        let (state, category_id) = get_state();
        let category = (category_id + 42).to_string();
        let multipart = must_make_multipart(
            &[
                ("name", "Kettle"),
                ("category", &category),
                ("price", "49.99"),
                ("created", "2025-03-01T09:30"),
                ("available", "on"),
            ],
            Some(("kettle.png", "image/png")),
        )
        .await;

        let response = create_product_endpoint(State(state.clone()), multipart).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = parse_html_document(response).await;
        assert_field_error(
            &must_get_form(&html),
            "category",
            "Select a valid choice. That choice is not one of the available choices.",
        );
        assert!(!state.media_root.exists());
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let (state, category_id) = get_state();
        let category = category_id.to_string();
        let multipart = must_make_multipart(
            &[
                ("name", "Kettle"),
                ("category", &category),
                ("price", "49.99"),
                ("created", "2025-03-01T09:30"),
                ("available", "on"),
            ],
            Some(("kettle.exe", "application/octet-stream")),
        )
        .await;

        let response = create_product_endpoint(State(state.clone()), multipart).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!state.media_root.exists());
    }

    fn count_files(directory: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(directory) else {
            return 0;
        };

        entries
            .map(|entry| entry.unwrap().path())
            .map(|path| if path.is_dir() { count_files(&path) } else { 1 })
            .sum()
    }

    #[tokio::test]
    async fn image_is_removed_when_category_disappears_before_insert() {
        let (state, category_id) = get_state();
        let valid_form = ValidProductForm {
            name: "Kettle".to_owned(),
            category_id,
            price: Price::from_cents(4_999),
            created: datetime!(2025-03-01 09:30 UTC),
            available: true,
            description: String::new(),
            image: UploadedImage {
                file_name: "kettle.png".to_owned(),
                content_type: Some("image/png".to_owned()),
                data: Bytes::from_static(PNG_BYTES),
            },
        };
        // Another request deletes the category after the form was checked.
        delete_category(category_id, &state.db_connection.lock().unwrap()).unwrap();

        let result = save_product(valid_form, UtcOffset::UTC, &state).await;

        assert_eq!(result, Err(Error::InvalidCategory));
        assert_eq!(count_files(&state.media_root), 0);
        let products =
            get_products(&ProductFilter::default(), &state.db_connection.lock().unwrap()).unwrap();
        assert!(products.is_empty());

        std::fs::remove_dir_all(&state.media_root).unwrap();
    }

    #[tokio::test]
    async fn database_failure_while_checking_category_is_server_error() {
        let (state, category_id) = get_state();
        let category = category_id.to_string();
        let multipart = must_make_multipart(
            &[
                ("name", "Kettle"),
                ("category", &category),
                ("price", "49.99"),
                ("created", "2025-03-01T09:30"),
                ("available", "on"),
            ],
            Some(("kettle.png", "image/png")),
        )
        .await;
        let db_connection = state.db_connection.clone();
        let _ = std::thread::spawn(move || {
            let _connection = db_connection.lock().unwrap();
            panic!("poison the database lock");
        })
        .join();

        let response = create_product_endpoint(State(state.clone()), multipart).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!state.media_root.exists());
    }
}
