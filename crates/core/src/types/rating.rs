//! Star ratings for product reviews.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Highest rating a review can give.
pub const MAX_RATING: u8 = 5;

/// Errors that can occur when building a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingError {
    /// No stars were selected.
    #[error("a rating is required")]
    Missing,
    /// More than [`MAX_RATING`] stars.
    #[error("rating must be between 1 and {MAX_RATING}, got {0}")]
    OutOfRange(u8),
}

/// A review's rating, 1 to 5 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::Missing`] for zero and
    /// [`RatingError::OutOfRange`] above [`MAX_RATING`].
    pub const fn new(stars: u8) -> Result<Self, RatingError> {
        match stars {
            0 => Err(RatingError::Missing),
            1..=MAX_RATING => Ok(Self(stars)),
            _ => Err(RatingError::OutOfRange(stars)),
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stars(Decimal::from(self.0)))
    }
}

/// Render an average as five stars: full stars for the whole part, a half
/// star when the fraction is at least one half, empty stars for the rest.
#[must_use]
pub fn stars(average: Decimal) -> String {
    let average = average.clamp(Decimal::ZERO, Decimal::from(MAX_RATING));
    let full = average.floor().to_usize().unwrap_or(0);
    let half = average.fract() >= Decimal::new(5, 1);
    let empty = usize::from(MAX_RATING).saturating_sub(average.ceil().to_usize().unwrap_or(0));

    let mut out = "★".repeat(full);
    if half {
        out.push('½');
    }
    out.push_str(&"☆".repeat(empty));
    out
}

/// Average and review count as shown next to a product, e.g. `4.5 (2 reviews)`.
#[must_use]
pub fn format_rating(average: Decimal, count: u32) -> String {
    let noun = if count == 1 { "review" } else { "reviews" };
    format!("{:.1} ({count} {noun})", average.round_dp(1))
}
