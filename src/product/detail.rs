//! The page for a single product.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::macros::format_description;

use crate::{
    AppState, Error,
    category::{Category, get_category},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base, format_rating,
    },
    navigation::NavBar,
    product::{
        Product, ProductId, get_product,
        rating::{MAX_SCORE, MIN_SCORE},
    },
};

/// The state needed for the product page.
#[derive(Debug, Clone)]
pub struct ProductPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProductPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render a product with its rating and the form for voting.
pub async fn get_product_page(
    Path(product_id): Path<ProductId>,
    State(state): State<ProductPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let product = get_product(product_id, &connection)?;
    let category = get_category(product.category_id, &connection)
        .inspect_err(|error| tracing::error!("Could not get category for product {product_id}: {error}"))?;

    Ok(product_view(&product, &category).into_response())
}

fn product_view(product: &Product, category: &Category) -> Markup {
    let nav_bar = NavBar::new(endpoints::PRODUCT_VIEW).into_html();
    let rate_url = format_endpoint(endpoints::RATE_PRODUCT, product.id);
    let created = product
        .created
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| product.created.date().to_string());

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            article class="w-full max-w-3xl space-y-4"
            {
                header class="space-y-2"
                {
                    h1 class="text-2xl font-bold" { (product.name) }

                    a
                        href={ (endpoints::ROOT) "?category=" (category.id) }
                        class=(CATEGORY_BADGE_STYLE)
                    {
                        (category.name)
                    }
                }

                @if let Some(image) = &product.image {
                    img
                        src={ (endpoints::MEDIA) "/" (image) }
                        alt=(product.name)
                        class="max-h-96 rounded";
                }

                dl class="grid grid-cols-2 gap-2"
                {
                    dt class="font-semibold" { "Price" }
                    dd id="price" { (product.price) }

                    dt class="font-semibold" { "Rating" }
                    dd id="rating" { (format_rating(product.average_rating, product.rating_votes)) }

                    dt class="font-semibold" { "Availability" }
                    dd { @if product.available { "In stock" } @else { "Unavailable" } }

                    dt class="font-semibold" { "Added" }
                    dd { (created) }
                }

                @if !product.description.is_empty() {
                    p { (product.description) }
                }

                form method="post" action=(rate_url) class="flex items-end gap-4 max-w-sm"
                {
                    div class="grow"
                    {
                        label for="score" class=(FORM_LABEL_STYLE) { "Your rating" }

                        select id="score" name="score" class=(FORM_TEXT_INPUT_STYLE) required
                        {
                            @for score in (MIN_SCORE..=MAX_SCORE).rev() {
                                option value=(score) { (score) }
                            }
                        }
                    }

                    div
                    {
                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Rate" }
                    }
                }
            }
        }
    );

    base(&product.name, &[], &content)
}
