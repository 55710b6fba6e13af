//! Field-level validation errors shared by the HTML forms and the REST API.

use std::{collections::BTreeMap, fmt::Display};

use serde::Serialize;

/// A mapping from a form field name to the human-readable problems with that field.
///
/// Fields are kept in alphabetical order so error output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    /// Create an empty set of field errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Create field errors with a single message.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Whether no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The messages recorded for `field`, empty if the field is valid.
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// The first message recorded for `field`, if any.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    /// Return `value` if no errors have been recorded, otherwise the errors.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }

                write!(f, "{field}: {message}")?;
                first = false;
            }
        }

        Ok(())
    }
}

/// Check that a trimmed text field is present and no longer than `max_length` characters.
///
/// Returns the trimmed text if it is valid, otherwise records an error
/// against `field` and returns `None`.
pub(crate) fn required_text(
    field: &'static str,
    raw: &str,
    max_length: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let text = raw.trim();

    if text.is_empty() {
        errors.add(field, "This field is required.");
        return None;
    }

    check_max_length(field, text, max_length, errors).then(|| text.to_owned())
}

/// Check that a trimmed, possibly empty text field is no longer than `max_length` characters.
pub(crate) fn optional_text(
    field: &'static str,
    raw: &str,
    max_length: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let text = raw.trim();

    check_max_length(field, text, max_length, errors).then(|| text.to_owned())
}

fn check_max_length(
    field: &'static str,
    text: &str,
    max_length: usize,
    errors: &mut FieldErrors,
) -> bool {
    let length = text.chars().count();

    if length > max_length {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {max_length} characters (it has {length})."
            ),
        );
        return false;
    }

    true
}

#[cfg(test)]
mod field_errors_tests {
    use super::{FieldErrors, optional_text, required_text};

    #[test]
    fn collects_messages_per_field() {
        let mut errors = FieldErrors::new();

        errors.add("price", "Too small.");
        errors.add("price", "Too many decimal places.");
        errors.add("name", "This field is required.");

        assert_eq!(errors.get("price").len(), 2);
        assert_eq!(errors.first("name"), Some("This field is required."));
        assert!(errors.get("description").is_empty());
    }

    #[test]
    fn serializes_as_map_of_lists() {
        let errors = FieldErrors::single("username", "Already taken.");

        let json = serde_json::to_string(&errors).unwrap();

        assert_eq!(json, r#"{"username":["Already taken."]}"#);
    }

    #[test]
    fn into_result_returns_value_when_empty() {
        assert_eq!(FieldErrors::new().into_result(42), Ok(42));
        assert!(FieldErrors::single("a", "b").into_result(42).is_err());
    }

    #[test]
    fn required_text_rejects_blank_input() {
        let mut errors = FieldErrors::new();

        let got = required_text("name", "   ", 10, &mut errors);

        assert_eq!(got, None);
        assert_eq!(errors.first("name"), Some("This field is required."));
    }

    #[test]
    fn required_text_trims_and_checks_length() {
        let mut errors = FieldErrors::new();

        assert_eq!(
            required_text("name", "  Bottle ", 10, &mut errors),
            Some("Bottle".to_owned())
        );
        assert!(errors.is_empty());

        assert_eq!(required_text("name", "a very long name", 10, &mut errors), None);
        assert_eq!(
            errors.first("name"),
            Some("Ensure this value has at most 10 characters (it has 16).")
        );
    }

    #[test]
    fn optional_text_allows_empty_input() {
        let mut errors = FieldErrors::new();

        assert_eq!(
            optional_text("description", "", 500, &mut errors),
            Some(String::new())
        );
        assert!(errors.is_empty());
    }
}
