//! The product list page with the catalog filters.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, CategoryId, get_all_categories},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, dollar_input_styles, format_rating,
    },
    navigation::NavBar,
    product::{Product, ProductFilter, ProductListQuery, get_products},
};

/// The state needed for the product list page.
#[derive(Debug, Clone)]
pub struct ProductListState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProductListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the products matching the filters in the query string.
///
/// A filter value that is not a number gets a 400 page naming the filter.
pub async fn get_products_page(
    State(state): State<ProductListState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, Error> {
    let query = ProductListQuery::from(pairs);
    let filter = ProductFilter::try_from(&query)
        .inspect_err(|error| tracing::debug!("Rejected product filters: {error}"))?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let products = get_products(&filter, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve products: {error}"))?;

    Ok(products_view(&query, &filter, &categories, &products).into_response())
}

fn products_view(
    query: &ProductListQuery,
    filter: &ProductFilter,
    categories: &[Category],
    products: &[Product],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::ROOT).into_html();
    let category_names: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|category| (category.id, category.name.as_ref()))
        .collect();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-6"
            {
                h1 class="text-xl font-bold" { "Products" }

                (category_links(categories, filter.category_id))

                (filter_form(query, categories, filter.category_id))

                @if products.is_empty() {
                    p { "No products match these filters." }
                } @else {
                    (products_table(products, &category_names))
                }
            }
        }
    );

    base("Products", &[dollar_input_styles()], &content)
}

fn category_links(categories: &[Category], selected: Option<CategoryId>) -> Markup {
    html!(
        nav aria-label="Categories" class="flex flex-wrap gap-2"
        {
            a
                href=(endpoints::ROOT)
                class=(LINK_STYLE)
                aria-current=[selected.is_none().then_some("page")]
            {
                "All"
            }

            @for category in categories {
                a
                    href={ (endpoints::ROOT) "?category=" (category.id) }
                    class=(CATEGORY_BADGE_STYLE)
                    aria-current=[(selected == Some(category.id)).then_some("page")]
                {
                    (category.name)
                }
            }
        }
    )
}

fn filter_form(
    query: &ProductListQuery,
    categories: &[Category],
    selected: Option<CategoryId>,
) -> Markup {
    let value = |field: &Option<String>| field.clone().unwrap_or_default();

    html!(
        form
            method="get"
            action=(endpoints::ROOT)
            class="grid grid-cols-2 md:grid-cols-6 gap-4 items-end"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name starts with" }
                input
                    type="text"
                    id="name"
                    name="name"
                    value=(value(&query.name))
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select id="category" name="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" selected[selected.is_none()] { "Any" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[selected == Some(category.id)]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="min_price" class=(FORM_LABEL_STYLE) { "Min price" }
                div class="input-wrapper"
                {
                    input
                        type="number"
                        id="min_price"
                        name="min_price"
                        min="0"
                        step="0.01"
                        value=(value(&query.min_price))
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="max_price" class=(FORM_LABEL_STYLE) { "Max price" }
                div class="input-wrapper"
                {
                    input
                        type="number"
                        id="max_price"
                        name="max_price"
                        min="0"
                        step="0.01"
                        value=(value(&query.max_price))
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="rating" class=(FORM_LABEL_STYLE) { "Min rating" }
                input
                    type="number"
                    id="rating"
                    name="rating"
                    min="0"
                    max="5"
                    step="0.5"
                    value=(value(&query.rating))
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
        }
    )
}

fn products_table(products: &[Product], category_names: &HashMap<CategoryId, &str>) -> Markup {
    html!(
        table class="w-full text-sm text-left"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Price" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Rating" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Availability" }
                }
            }

            tbody
            {
                @for product in products {
                    tr class=(TABLE_ROW_STYLE) data-product-id=(product.id)
                    {
                        td class=(TABLE_CELL_STYLE)
                        {
                            a
                                href=(format_endpoint(endpoints::PRODUCT_VIEW, product.id))
                                class=(LINK_STYLE)
                            {
                                (product.name)
                            }
                        }

                        td class=(TABLE_CELL_STYLE)
                        {
                            span class=(CATEGORY_BADGE_STYLE)
                            {
                                (category_names.get(&product.category_id).copied().unwrap_or("Unknown"))
                            }
                        }

                        td class=(TABLE_CELL_STYLE) { (product.price) }

                        td class=(TABLE_CELL_STYLE)
                        {
                            (format_rating(product.average_rating, product.rating_votes))
                        }

                        td class=(TABLE_CELL_STYLE)
                        {
                            @if product.available { "In stock" } @else { "Unavailable" }
                        }
                    }
                }
            }
        }
    )
}

#[cfg(test)]
mod products_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        Error,
        category::{CategoryId, CategoryName, create_category},
        db::initialize,
        product::{create_product, test_product},
        test_utils::{assert_valid_html, parse_html_document, select_texts},
    };

    use super::{ProductListState, get_products_page};

    struct Fixture {
        state: ProductListState,
        kitchen: CategoryId,
        garden: CategoryId,
    }

    fn get_fixture() -> Fixture {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let kitchen = create_category(CategoryName::new_unchecked("Kitchen"), "", &connection)
            .unwrap()
            .id;
        let garden = create_category(CategoryName::new_unchecked("Garden"), "", &connection)
            .unwrap()
            .id;

        let products = [
            (kitchen, "Bottle", 1_000, 3.5),
            (kitchen, "Bowl", 1_500, 2.0),
            (garden, "Boot scraper", 2_500, 4.5),
            (garden, "Spade", 3_000, 3.0),
        ];

        for (category_id, name, price_cents, rating) in products {
            let product =
                create_product(test_product(category_id, name, price_cents), &connection).unwrap();
            connection
                .execute(
                    "UPDATE product SET average_rating = ?1, rating_votes = 2 WHERE id = ?2",
                    (rating, product.id),
                )
                .unwrap();
        }

        Fixture {
            state: ProductListState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            kitchen,
            garden,
        }
    }

    fn query(query_string: &str) -> Query<Vec<(String, String)>> {
        Query(serde_urlencoded::from_str(query_string).unwrap())
    }

    async fn product_names(fixture: &Fixture, query_string: &str) -> Vec<String> {
        let response = get_products_page(State(fixture.state.clone()), query(query_string))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        select_texts(&html, "tbody tr td:first-child a")
    }

    #[tokio::test]
    async fn lists_all_products_without_filters() {
        let fixture = get_fixture();

        let names = product_names(&fixture, "").await;

        assert_eq!(names, ["Bottle", "Bowl", "Boot scraper", "Spade"]);
    }

    #[tokio::test]
    async fn filters_by_category_and_rating() {
        let fixture = get_fixture();

        let names = product_names(
            &fixture,
            &format!("category={}&rating=3", fixture.kitchen),
        )
        .await;

        assert_eq!(names, ["Bottle"]);
    }

    #[tokio::test]
    async fn combines_price_range_and_name_prefix() {
        let fixture = get_fixture();

        let names = product_names(&fixture, "min_price=10&max_price=25&name=bo").await;

        assert_eq!(names, ["Bottle", "Bowl", "Boot scraper"]);
    }

    #[tokio::test]
    async fn repeated_and_aliased_filters_still_render() {
        let fixture = get_fixture();

        let names = product_names(
            &fixture,
            &format!(
                "category={}&category={}&rating=3&min_rating=1",
                fixture.garden, fixture.kitchen
            ),
        )
        .await;

        assert_eq!(names, ["Boot scraper", "Spade"]);
    }

    #[tokio::test]
    async fn empty_filters_are_ignored() {
        let fixture = get_fixture();

        let names =
            product_names(&fixture, "category=&min_price=&max_price=&name=&rating=").await;

        assert_eq!(names.len(), 4);
    }

    #[tokio::test]
    async fn selected_category_is_marked_current() {
        let fixture = get_fixture();
        let response = get_products_page(
            State(fixture.state.clone()),
            query(&format!("category={}", fixture.garden)),
        )
        .await
        .unwrap();

        let html = parse_html_document(response).await;

        let current = html
            .select(&Selector::parse("nav[aria-label=Categories] a[aria-current=page]").unwrap())
            .map(|link| link.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(current, ["Garden"]);

        let selected = html
            .select(&Selector::parse("select[name=category] option[selected]").unwrap())
            .map(|option| option.value().attr("value").unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(selected, [fixture.garden.to_string()]);
    }

    #[tokio::test]
    async fn non_numeric_filter_is_bad_request() {
        let fixture = get_fixture();

        let result = get_products_page(State(fixture.state.clone()), query("max_price=cheap")).await;

        let error = result.unwrap_err();
        assert_eq!(
            error,
            Error::InvalidFilter {
                field: "max_price",
                value: "cheap".to_owned()
            }
        );
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn shows_message_when_nothing_matches() {
        let fixture = get_fixture();

        let response = get_products_page(State(fixture.state.clone()), query("name=zzz"))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No products match these filters."));
    }
}
