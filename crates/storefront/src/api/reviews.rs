//! Product review endpoints under `/products/{id}/reviews`.
//!
//! Writing a review changes the product's average rating, so every write
//! drops the product from the detail cache.

use hearthwood_core::{ProductId, Rating, ReviewId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{ApiClient, ApiError};
use crate::error::add_breadcrumb;

/// A review as listed under a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: ReviewId,
    pub rating: Rating,
    #[serde(default, alias = "comment")]
    pub review_text: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, alias = "review_date")]
    pub created_at: Option<String>,
}

impl Review {
    /// Name shown above the review.
    #[must_use]
    pub fn author(&self) -> &str {
        [&self.full_name, &self.username]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|n| !n.trim().is_empty())
            .unwrap_or("Anonymous")
    }

    /// Review text, if the reviewer wrote any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.review_text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Body of a review create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRequest {
    pub rating: Rating,
    pub review_text: String,
}

/// The list endpoint answers either a bare array or `{"reviews": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReviewsBody {
    Bare(Vec<Review>),
    Wrapped {
        #[serde(default)]
        reviews: Vec<Review>,
    },
}

impl ApiClient {
    /// Reviews of a product, newest first as the backend orders them.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn product_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, ApiError> {
        let url = self.endpoint_segments(&["products", &product_id.as_path_segment(), "reviews"])?;
        let body: ReviewsBody = self.get_json(url).await?;
        Ok(match body {
            ReviewsBody::Bare(reviews) | ReviewsBody::Wrapped { reviews } => reviews,
        })
    }

    /// Review a product as the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if not logged in, the backend rejects the review
    /// (e.g. already reviewed), or the request fails.
    #[instrument(skip(self, review), fields(rating = review.rating.get()))]
    pub async fn add_review(&self, product_id: &ProductId, review: &ReviewRequest) -> Result<(), ApiError> {
        let url = self.endpoint_segments(&["products", &product_id.as_path_segment(), "reviews"])?;
        self.post_value(url, review).await?;
        self.invalidate_product(product_id).await;
        info!("Review added");
        let product = product_id.to_string();
        add_breadcrumb("reviews", "Added review", Some(&[("product_id", product.as_str())]));
        Ok(())
    }

    /// Replace the rating and text of one of the user's reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if the review is not the user's, does not exist, or
    /// the request fails.
    #[instrument(skip(self, review), fields(rating = review.rating.get()))]
    pub async fn update_review(
        &self,
        product_id: &ProductId,
        review_id: ReviewId,
        review: &ReviewRequest,
    ) -> Result<(), ApiError> {
        let url = self.endpoint_segments(&[
            "products",
            &product_id.as_path_segment(),
            "reviews",
            &review_id.to_string(),
        ])?;
        self.put_value(url, review).await?;
        self.invalidate_product(product_id).await;
        info!("Review updated");
        Ok(())
    }

    /// Delete one of the user's reviews.
    ///
    /// # Errors
    ///
    /// Returns an error if the review is not the user's, does not exist, or
    /// the request fails.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, product_id: &ProductId, review_id: ReviewId) -> Result<(), ApiError> {
        let url = self.endpoint_segments(&[
            "products",
            &product_id.as_path_segment(),
            "reviews",
            &review_id.to_string(),
        ])?;
        self.delete_value(url).await?;
        self.invalidate_product(product_id).await;
        info!("Review deleted");
        let review = review_id.to_string();
        add_breadcrumb("reviews", "Deleted review", Some(&[("review_id", review.as_str())]));
        Ok(())
    }
}
