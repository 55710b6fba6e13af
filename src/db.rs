//! Database schema setup.

use rusqlite::{Connection, Transaction};

use crate::{
    Error, category::create_category_table, product::create_product_table,
    user::create_user_table,
};

/// Create all the tables for the application's domain models.
///
/// Foreign keys are switched on for `connection` so that products cannot
/// point at a missing category and a category with products cannot be deleted.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        Transaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_product_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
