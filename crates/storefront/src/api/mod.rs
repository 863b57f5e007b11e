//! Backend REST API client.
//!
//! # Architecture
//!
//! - `reqwest` with a per-request timeout from configuration
//! - Bearer token from [`crate::session::AuthSession`] on every request
//! - Any 401 clears the stored token and surfaces as [`ApiError::Unauthorized`]
//! - Product details cached via `moka` (TTL from configuration)
//!
//! The cart and checkout code depend on the [`ProductCatalog`] and
//! [`OrderGateway`] traits rather than on [`ApiClient`] directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use hearthwood_storefront::api::{ApiClient, ProductCatalog};
//!
//! let client = ApiClient::new(&config, session)?;
//! let product = client.product(&ProductId::from(12)).await?;
//! let page = client.list_products(&ProductQuery::default()).await?;
//! ```

mod auth;
mod client;
mod orders;
mod products;
mod reviews;

pub use auth::{
    AuthResponse, LoginRequest, PasswordChangeRequest, ProfileUpdate, RegisterRequest, UserProfile,
};
pub use client::ApiClient;
pub use orders::{
    GuestCheckoutRequest, Order, OrderConfirmation, OrderItem, OrderLineRequest, OrderRequest,
};
pub use products::{Category, LiveCatalog, Product, ProductImage, ProductPage, ProductQuery};
pub use reviews::{Review, ReviewRequest};

use async_trait::async_trait;
use hearthwood_core::ProductId;
use secrecy::{ExposeSecret, SecretString};
use serde::Serializer;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, TLS, etc.).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The backend rejected the bearer token (or none was sent).
    #[error("unauthorized")]
    Unauthorized,

    /// Non-success response. `message` is the server's human-readable text,
    /// if the error body had one.
    #[error("API error: {status}{}", .message.as_deref().map(|m| format!(" - {m}")).unwrap_or_default())]
    Api { status: u16, message: Option<String> },

    /// A success response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The auth session could not be read or written.
    #[error("session storage error: {0}")]
    Session(#[from] StorageError),
}

impl ApiError {
    /// The message the server sent with the error, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text to show the user: the server's message if it sent one, otherwise
    /// `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            _ => self.server_message().unwrap_or(fallback).to_string(),
        }
    }

    /// True for 404 responses.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Serialize a secret as a plain string. Only for request bodies.
fn expose_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Source of product details for cart enrichment and re-validation.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    async fn product(&self, id: &ProductId) -> Result<Product, ApiError>;
}

/// Order submission endpoints used by checkout.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Place an order for the logged-in user (`POST /orders`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or is unreachable.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError>;

    /// Place an order and create an account in one step
    /// (`POST /orders/guest-checkout`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or is unreachable.
    async fn guest_checkout(
        &self,
        order: &GuestCheckoutRequest,
    ) -> Result<OrderConfirmation, ApiError>;
}
