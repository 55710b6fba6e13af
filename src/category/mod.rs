//! Product categories and the pages for managing them.

mod create;
mod db;
mod delete;
mod domain;
mod list;

pub use create::{create_category_endpoint, get_create_category_page};
pub use db::{
    count_products_per_category, create_category, create_category_table, delete_category,
    get_all_categories, get_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryForm, CategoryId, CategoryName};
pub use list::get_categories_page;

/// The heading shown when deleting a category is refused.
pub const CATEGORY_IN_USE_ERROR_MSG: &str = "This category still has products.";
