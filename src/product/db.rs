//! Database operations for products.

use rusqlite::{Connection, Row, ToSql};

use crate::{
    Error,
    category::CategoryId,
    product::{
        NewProduct, Price, Product, ProductId,
        filter::{ProductFilter, like_prefix_pattern},
    },
};

/// Add a product to the catalog and return it with its generated ID.
///
/// New products start with no votes and an average rating of zero.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidCategory] if the category does not exist,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_product(new_product: NewProduct, connection: &Connection) -> Result<Product, Error> {
    connection
        .execute(
            "INSERT INTO product (category_id, name, name_folded, price, created, available,
                description, image)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            (
                new_product.category_id,
                &new_product.name,
                new_product.name.to_lowercase(),
                new_product.price.cents(),
                new_product.created,
                new_product.available,
                &new_product.description,
                &new_product.image,
            ),
        )
        .map_err(|error| match error {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
                Error::InvalidCategory
            }
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Product {
        id,
        category_id: new_product.category_id,
        name: new_product.name,
        price: new_product.price,
        created: new_product.created,
        available: new_product.available,
        description: new_product.description,
        image: new_product.image,
        average_rating: 0.0,
        rating_votes: 0,
    })
}

const PRODUCT_COLUMNS: &str = "id, category_id, name, price, created, available, description, \
    image, average_rating, rating_votes";

/// Retrieve a single product by ID.
pub fn get_product(product_id: ProductId, connection: &Connection) -> Result<Product, Error> {
    connection
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = :id;"
        ))?
        .query_row(&[(":id", &product_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve the products matching every filter in `filter`, ordered by ID.
///
/// The filters are combined into a single parameterised query.
pub fn get_products(filter: &ProductFilter, connection: &Connection) -> Result<Vec<Product>, Error> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(category_id) = filter.category_id {
        conditions.push("category_id = ?");
        params.push(Box::new(category_id));
    }

    if let Some(max_price_cents) = filter.max_price_cents {
        conditions.push("price <= ?");
        params.push(Box::new(max_price_cents));
    }

    if let Some(min_price_cents) = filter.min_price_cents {
        conditions.push("price >= ?");
        params.push(Box::new(min_price_cents));
    }

    if let Some(name_prefix) = &filter.name_prefix {
        // SQLite only folds ASCII case, so match against the name lower-cased in Rust.
        conditions.push("name_folded LIKE ? ESCAPE '\\'");
        params.push(Box::new(like_prefix_pattern(&name_prefix.to_lowercase())));
    }

    if let Some(min_rating) = filter.min_rating {
        conditions.push("average_rating >= ?");
        params.push(Box::new(min_rating));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let query = format!("SELECT {PRODUCT_COLUMNS} FROM product {where_clause} ORDER BY id ASC;");

    connection
        .prepare(&query)?
        .query_map(rusqlite::params_from_iter(params.iter()), map_row)?
        .map(|maybe_product| maybe_product.map_err(|error| error.into()))
        .collect()
}

/// Initialize the product table and indexes.
///
/// The category table must exist first.
pub fn create_product_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE RESTRICT,
            name TEXT NOT NULL,
            name_folded TEXT NOT NULL,
            price INTEGER NOT NULL CHECK (price >= 100),
            created TEXT NOT NULL,
            available INTEGER NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image TEXT,
            average_rating REAL NOT NULL DEFAULT 0
                CHECK (average_rating >= 0 AND average_rating <= 5),
            rating_votes INTEGER NOT NULL DEFAULT 0 CHECK (rating_votes >= 0)
        );

        CREATE INDEX IF NOT EXISTS idx_product_category ON product(category_id);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Product, rusqlite::Error> {
    let category_id: CategoryId = row.get(1)?;
    let price_cents: i64 = row.get(3)?;

    Ok(Product {
        id: row.get(0)?,
        category_id,
        name: row.get(2)?,
        price: Price::from_cents(price_cents),
        created: row.get(4)?,
        available: row.get(5)?,
        description: row.get(6)?,
        image: row.get(7)?,
        average_rating: row.get(8)?,
        rating_votes: row.get(9)?,
    })
}
