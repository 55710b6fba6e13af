//! Parsing the catalog filter query parameters.

use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{Error, category::CategoryId};

/// The raw query parameters of the product list page.
///
/// Every parameter is kept as text so that a bad value can be reported by
/// name instead of rejecting the whole query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub max_price: Option<String>,
    pub min_price: Option<String>,
    pub name: Option<String>,
    pub rating: Option<String>,
}

impl From<Vec<(String, String)>> for ProductListQuery {
    /// Build the query from decoded key-value pairs.
    ///
    /// The first value of a repeated parameter wins and unknown parameters
    /// are ignored. `min_rating` is read as `rating` when `rating` is absent.
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        let mut min_rating = None;

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "category" => &mut query.category,
                "max_price" => &mut query.max_price,
                "min_price" => &mut query.min_price,
                "name" => &mut query.name,
                "rating" => &mut query.rating,
                "min_rating" => &mut min_rating,
                _ => continue,
            };

            slot.get_or_insert(value);
        }

        if query.rating.is_none() {
            query.rating = min_rating;
        }

        query
    }
}

/// The typed catalog filters, `None` means no constraint.
///
/// Prices are in cents, rounded so that the bounds still include every
/// product a decimal bound would include.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub max_price_cents: Option<i64>,
    pub min_price_cents: Option<i64>,
    pub name_prefix: Option<String>,
    pub min_rating: Option<f64>,
}

impl ProductFilter {
    /// Whether any filter is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TryFrom<&ProductListQuery> for ProductFilter {
    type Error = Error;

    fn try_from(query: &ProductListQuery) -> Result<Self, Self::Error> {
        let category_id = non_empty(&query.category)
            .map(|raw| parse_field::<CategoryId>("category", raw))
            .transpose()?;

        let max_price_cents = non_empty(&query.max_price)
            .map(|raw| parse_field::<Decimal>("max_price", raw))
            .transpose()?
            .map(|price| to_cents(price, Decimal::floor));

        let min_price_cents = non_empty(&query.min_price)
            .map(|raw| parse_field::<Decimal>("min_price", raw))
            .transpose()?
            .map(|price| to_cents(price, Decimal::ceil));

        let min_rating = non_empty(&query.rating)
            .map(|raw| {
                parse_field::<f64>("rating", raw).and_then(|rating| {
                    if rating.is_finite() {
                        Ok(rating)
                    } else {
                        Err(invalid("rating", raw))
                    }
                })
            })
            .transpose()?;

        Ok(Self {
            category_id,
            max_price_cents,
            min_price_cents,
            name_prefix: non_empty(&query.name).map(str::to_owned),
            min_rating,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, Error> {
    raw.parse().map_err(|_| invalid(field, raw))
}

fn invalid(field: &'static str, raw: &str) -> Error {
    Error::InvalidFilter {
        field,
        value: raw.to_owned(),
    }
}

/// Convert a dollar amount to cents, saturating at the `i64` bounds.
fn to_cents(price: Decimal, round: fn(&Decimal) -> Decimal) -> i64 {
    let saturated = if price.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    };

    price
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| round(&cents))
        .and_then(|cents| cents.to_i64())
        .unwrap_or(saturated)
}

/// Escape the `LIKE` wildcards in `prefix` and append a trailing wildcard.
///
/// The pattern must be used with `ESCAPE '\'`.
pub(crate) fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);

    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }

    pattern.push('%');
    pattern
}
