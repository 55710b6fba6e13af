//! Core category domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    FieldErrors,
    validation::{optional_text, required_text},
};

/// The longest category name that may be saved.
pub const CATEGORY_NAME_MAX_LENGTH: usize = 50;

/// A validated, non-empty category name of at most [CATEGORY_NAME_MAX_LENGTH] characters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return the field errors for `name` if it is blank or too long.
    pub fn new(name: &str) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required_text("name", name, CATEGORY_NAME_MAX_LENGTH, &mut errors);

        match name {
            Some(name) => errors.into_result(Self(name)),
            None => Err(errors),
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a category.
pub type CategoryId = i64;

/// A group of products, e.g. 'Kitchen' or 'Garden'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
    pub description: String,
}

/// Form data for category creation.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CategoryForm {
    /// Check the form and return the trimmed name and description.
    ///
    /// # Errors
    ///
    /// Returns the errors for every invalid field.
    pub fn validate(&self) -> Result<(CategoryName, String), FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required_text("name", &self.name, CATEGORY_NAME_MAX_LENGTH, &mut errors);
        // Descriptions have no length limit, `usize::MAX` only trims them.
        let description = optional_text("description", &self.description, usize::MAX, &mut errors);

        match (name, description) {
            (Some(name), Some(description)) => {
                errors.into_result((CategoryName::new_unchecked(&name), description))
            }
            _ => Err(errors),
        }
    }
}
