//! Voting on products and keeping their average rating up to date.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    product::ProductId,
};

/// The lowest score a voter can give.
pub const MIN_SCORE: u8 = 1;
/// The highest score a voter can give.
pub const MAX_SCORE: u8 = 5;

/// A single vote, a whole number from [MIN_SCORE] to [MAX_SCORE].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score(u8);

impl Score {
    /// Parse a score submitted by a voter.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidScore] if `raw_score` is not a whole number on
    /// the voting scale.
    pub fn parse(raw_score: &str) -> Result<Self, Error> {
        raw_score
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|score| (MIN_SCORE..=MAX_SCORE).contains(score))
            .map(Self)
            .ok_or_else(|| Error::InvalidScore(raw_score.to_owned()))
    }

    /// The score as a number.
    pub fn value(self) -> u8 {
        self.0
    }
}

/// The running average of the votes for a product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub rating_votes: u32,
}

/// Add `score` to the running average of a product.
///
/// The new average is computed from the stored average and vote count in a
/// single statement, so concurrent votes are never lost.
///
/// # Errors
///
/// Returns [Error::NotFound] if the product does not exist.
pub fn rate_product(
    product_id: ProductId,
    score: Score,
    connection: &Connection,
) -> Result<RatingSummary, Error> {
    connection
        .prepare(
            "UPDATE product
            SET average_rating = CAST(average_rating * rating_votes + ?1 AS REAL) / (rating_votes + 1),
                rating_votes = rating_votes + 1
            WHERE id = ?2
            RETURNING average_rating, rating_votes",
        )?
        .query_row((score.value(), product_id), |row| {
            Ok(RatingSummary {
                average_rating: row.get(0)?,
                rating_votes: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

/// The state needed for rating a product.
#[derive(Debug, Clone)]
pub struct RateProductState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RateProductState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for a vote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateForm {
    #[serde(default)]
    pub score: String,
}

/// Handle a vote for a product.
///
/// Redirects back to the product page on success. Invalid scores get a 400
/// page and leave the product unchanged.
pub async fn rate_product_endpoint(
    Path(product_id): Path<ProductId>,
    State(state): State<RateProductState>,
    Form(form): Form<RateForm>,
) -> Response {
    let score = match Score::parse(&form.score) {
        Ok(score) => score,
        Err(error) => {
            tracing::debug!("Rejected vote for product {product_id}: {error}");
            return error.into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match rate_product(product_id, score, &connection) {
        Ok(summary) => {
            tracing::info!(
                "Product {product_id} rated {}, now {:.2} from {} votes",
                score.value(),
                summary.average_rating,
                summary.rating_votes
            );
            Redirect::to(&format_endpoint(endpoints::PRODUCT_VIEW, product_id)).into_response()
        }
        Err(error) => error.into_response(),
    }
}


#[cfg(test)]
mod rate_product_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        category::{CategoryName, create_category},
        db::initialize,
        product::{NewProduct, Price, ProductId, create_product, get_product},
    };

    use super::{RatingSummary, Score, rate_product};

    fn get_connection_with_product() -> (Connection, ProductId) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let category =
            create_category(CategoryName::new_unchecked("Kitchen"), "", &connection).unwrap();
        let product = create_product(
            NewProduct {
                category_id: category.id,
                name: "Kettle".to_owned(),
                price: Price::from_cents(4_999),
                created: datetime!(2025-03-01 09:30 UTC),
                available: true,
                description: String::new(),
                image: None,
            },
            &connection,
        )
        .unwrap();

        (connection, product.id)
    }

    fn score(value: u8) -> Score {
        Score::parse(&value.to_string()).unwrap()
    }

    #[test]
    fn first_vote_sets_the_average() {
        let (connection, product_id) = get_connection_with_product();

        let summary = rate_product(product_id, score(3), &connection).unwrap();

        assert_eq!(
            summary,
            RatingSummary {
                average_rating: 3.0,
                rating_votes: 1
            }
        );
    }

    #[test]
    fn adds_vote_to_existing_average() {
        let (connection, product_id) = get_connection_with_product();
        connection
            .execute(
                "UPDATE product SET average_rating = 4.0, rating_votes = 3 WHERE id = ?1",
                (product_id,),
            )
            .unwrap();

        let summary = rate_product(product_id, score(5), &connection).unwrap();

        assert_eq!(
            summary,
            RatingSummary {
                average_rating: 4.25,
                rating_votes: 4
            }
        );
        let product = get_product(product_id, &connection).unwrap();
        assert_eq!(product.average_rating, 4.25);
        assert_eq!(product.rating_votes, 4);
    }

    #[test]
    fn average_is_the_mean_of_all_votes() {
        let (connection, product_id) = get_connection_with_product();
        let votes = [5, 1, 4, 4, 2, 3, 5, 5, 1, 3, 4];

        for vote in votes {
            rate_product(product_id, score(vote), &connection).unwrap();
        }

        let product = get_product(product_id, &connection).unwrap();
        let want_mean =
            votes.iter().map(|&vote| f64::from(vote)).sum::<f64>() / votes.len() as f64;
        assert!(
            (product.average_rating - want_mean).abs() < 1e-9,
            "want average {want_mean}, got {}",
            product.average_rating
        );
        assert_eq!(product.rating_votes as usize, votes.len());
    }

    #[test]
    fn rating_missing_product_is_not_found() {
        let (connection, product_id) = get_connection_with_product();

        let result = rate_product(product_id + 1, score(5), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }
}
