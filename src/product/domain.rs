//! Core product domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{category::CategoryId, html::format_currency};

/// Database identifier for a product.
pub type ProductId = i64;

/// The most digits a price may have, including the two decimal places.
const PRICE_MAX_DIGITS: u32 = 10;
/// The most decimal places a price may have.
const PRICE_MAX_DECIMAL_PLACES: u32 = 2;

/// A product price of at least one dollar with at most two decimal places.
///
/// Prices are stored as a whole number of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Parse and validate a price entered by a user, e.g. "12.5".
    ///
    /// # Errors
    ///
    /// Returns a message suitable for showing next to the form field if the
    /// text is not a number, is less than one, or has too many digits.
    pub fn parse(raw_price: &str) -> Result<Self, String> {
        let raw_price = raw_price.trim();

        if raw_price.is_empty() {
            return Err("This field is required.".to_owned());
        }

        let price = Decimal::from_str(raw_price).map_err(|_| "Enter a number.".to_owned())?;

        Self::new(price)
    }

    /// Validate a decimal price.
    ///
    /// # Errors
    ///
    /// Returns a message if the price is less than one, has more than two
    /// decimal places or more than ten digits.
    pub fn new(price: Decimal) -> Result<Self, String> {
        let decimal_places = price.scale();
        let significant_digits = price.mantissa().unsigned_abs().to_string().len() as u32;
        let digits = significant_digits.max(decimal_places);
        let whole_digits = digits - decimal_places;

        if digits > PRICE_MAX_DIGITS {
            return Err(format!(
                "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
            ));
        }

        if decimal_places > PRICE_MAX_DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {PRICE_MAX_DECIMAL_PLACES} decimal places."
            ));
        }

        if whole_digits > PRICE_MAX_DIGITS - PRICE_MAX_DECIMAL_PLACES {
            return Err(format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                PRICE_MAX_DIGITS - PRICE_MAX_DECIMAL_PLACES
            ));
        }

        if price < Decimal::ONE {
            return Err("Ensure this value is greater than or equal to 1.".to_owned());
        }

        Ok(Self(price))
    }

    /// Create a price from a whole number of cents, e.g. 1250 for $12.50.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The price as a whole number of cents.
    pub fn cents(&self) -> i64 {
        // Valid prices have at most ten digits so they always fit.
        (self.0 * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(i64::MAX)
    }

    /// The price as a decimal number of dollars.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_currency(self.0.to_f64().unwrap_or_default()))
    }
}

/// An item for sale in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub price: Price,
    /// When the product was added to the catalog.
    pub created: OffsetDateTime,
    pub available: bool,
    pub description: String,
    /// The path of the product image relative to the media directory.
    pub image: Option<String>,
    /// The mean of all scores given to the product, zero if it has no votes.
    pub average_rating: f64,
    pub rating_votes: u32,
}

/// The validated data needed to add a product to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub price: Price,
    pub created: OffsetDateTime,
    pub available: bool,
    pub description: String,
    pub image: Option<String>,
}

#[cfg(test)]
mod price_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::Price;

    #[test]
    fn parses_valid_prices() {
        assert_eq!(Price::parse("1"), Ok(Price::from_cents(100)));
        assert_eq!(Price::parse(" 12.5 "), Ok(Price::from_cents(1_250)));
        assert_eq!(Price::parse("99999999.99"), Ok(Price::from_cents(9_999_999_999)));
    }

    #[test]
    fn rejects_text() {
        assert_eq!(Price::parse("ten"), Err("Enter a number.".to_owned()));
        assert_eq!(Price::parse(""), Err("This field is required.".to_owned()));
    }

    #[test]
    fn rejects_price_below_one() {
        assert_eq!(
            Price::parse("0.99"),
            Err("Ensure this value is greater than or equal to 1.".to_owned())
        );
        assert!(Price::parse("-5").is_err());
    }

    #[test]
    fn rejects_three_decimal_places() {
        assert_eq!(
            Price::parse("1.999"),
            Err("Ensure that there are no more than 2 decimal places.".to_owned())
        );
    }

    #[test]
    fn rejects_too_many_digits() {
        assert_eq!(
            Price::parse("12345678901"),
            Err("Ensure that there are no more than 10 digits in total.".to_owned())
        );
        assert_eq!(
            Price::parse("123456789"),
            Err("Ensure that there are no more than 8 digits before the decimal point.".to_owned())
        );
    }

    #[test]
    fn converts_to_and_from_cents() {
        let price = Price::new(Decimal::from_str("19.99").unwrap()).unwrap();

        assert_eq!(price.cents(), 1_999);
        assert_eq!(Price::from_cents(1_999), price);
    }

    #[test]
    fn displays_as_currency() {
        assert_eq!(Price::from_cents(1_250).to_string(), "$12.50");
    }
}
