//! Products, the catalog filters and product ratings.

mod create;
mod db;
mod detail;
mod domain;
mod filter;
mod form;
mod image;
mod list;
mod rating;

pub use create::{create_product_endpoint, get_create_product_page};
pub use db::{create_product, create_product_table, get_product, get_products};
pub use detail::get_product_page;
pub use domain::{NewProduct, Price, Product, ProductId};
pub use filter::{ProductFilter, ProductListQuery};
pub use list::get_products_page;
pub use rating::rate_product_endpoint;

#[cfg(test)]
pub(crate) use test_helpers::test_product;
