//! Order endpoints: placement, history, cancellation, guest tracking.

use async_trait::async_trait;
use hearthwood_core::{Email, OrderId, OrderStatus, Price, ProductId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{ApiClient, ApiError, OrderGateway};
use crate::error::add_breadcrumb;

/// One `{product_id, quantity}` entry of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub shipping_address: String,
    pub cart_items: Vec<OrderLineRequest>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// Body of `POST /orders/guest-checkout`: an order plus the account to create.
#[derive(Debug, Serialize)]
pub struct GuestCheckoutRequest {
    pub username: String,
    #[serde(serialize_with = "super::expose_secret")]
    pub password: SecretString,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub cart_items: Vec<OrderLineRequest>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

/// What the backend returned for a newly placed order.
///
/// Every field is optional: the order exists once the backend answered 2xx,
/// whatever the body looks like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderConfirmation {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub total_amount: Option<Price>,
    /// Username of the account created by guest checkout.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderConfirmation {
    fn from_body(body: Value) -> Self {
        serde_json::from_value(body).unwrap_or_else(|e| {
            warn!(error = %e, "Order confirmation body not understood");
            Self::default()
        })
    }
}

/// An order as listed in the order history or tracking view.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Price,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Only pending orders may be cancelled by the customer.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        self.status.is_cancellable()
    }
}

/// A line of a placed order, priced at purchase time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub order_item_id: Option<i64>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub price_at_purchase: Option<Price>,
    #[serde(default)]
    pub subtotal: Option<Price>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl OrderItem {
    /// `subtotal` when the backend sent one, else unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.subtotal.unwrap_or_else(|| {
            self.price_at_purchase
                .unwrap_or(Price::ZERO)
                .times(self.quantity)
        })
    }
}

#[derive(Debug, Deserialize)]
struct OrdersEnvelope {
    #[serde(default)]
    orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: Order,
}

impl ApiClient {
    /// Place an order for the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or is unreachable.
    #[instrument(skip(self, order), fields(lines = order.cart_items.len()))]
    pub async fn create_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError> {
        let url = self.endpoint("orders")?;
        let body = self.post_value(url, order).await?;
        let confirmation = OrderConfirmation::from_body(body);
        info!(order_id = ?confirmation.order_id, "Order placed");
        add_breadcrumb("checkout", "Order placed", None);
        Ok(confirmation)
    }

    /// Place an order and create the guest's account in the same request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the order or is unreachable.
    #[instrument(skip(self, order), fields(lines = order.cart_items.len()))]
    pub async fn create_guest_order(
        &self,
        order: &GuestCheckoutRequest,
    ) -> Result<OrderConfirmation, ApiError> {
        let url = self.endpoint_segments(&["orders", "guest-checkout"])?;
        let body = self.post_value(url, order).await?;
        let confirmation = OrderConfirmation::from_body(body);
        info!(order_id = ?confirmation.order_id, "Guest order placed");
        add_breadcrumb("checkout", "Guest order placed", None);
        Ok(confirmation)
    }

    /// The logged-in user's orders (`GET /orders`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint("orders")?;
        let envelope: OrdersEnvelope = self.get_json(url).await?;
        Ok(envelope.orders)
    }

    /// One of the logged-in user's orders (`GET /orders/{id}`).
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or the request fails.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        let url = self.endpoint_segments(&["orders", &id.to_string()])?;
        let envelope: OrderEnvelope = self.get_json(url).await?;
        Ok(envelope.order)
    }

    /// Cancel a pending order (`PUT /orders/{id}/cancel`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses (e.g. the order already
    /// shipped) or the request fails.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<(), ApiError> {
        let url = self.endpoint_segments(&["orders", &id.to_string(), "cancel"])?;
        self.put_value(url, &serde_json::json!({})).await?;
        info!("Order cancelled");
        let order_id = id.to_string();
        add_breadcrumb("orders", "Cancelled order", Some(&[("order_id", order_id.as_str())]));
        Ok(())
    }

    /// Look up a guest order by id and the email it was placed with
    /// (`GET /orders/track/{id}?email=`).
    ///
    /// # Errors
    ///
    /// Returns an error if no such order exists for that email or the
    /// request fails.
    #[instrument(skip(self, email))]
    pub async fn track_order(&self, id: OrderId, email: &Email) -> Result<Order, ApiError> {
        let mut url = self.endpoint_segments(&["orders", "track", &id.to_string()])?;
        url.query_pairs_mut().append_pair("email", email.as_str());
        let envelope: OrderEnvelope = self.get_json(url).await?;
        Ok(envelope.order)
    }
}

#[async_trait]
impl OrderGateway for ApiClient {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError> {
        self.create_order(order).await
    }

    async fn guest_checkout(
        &self,
        order: &GuestCheckoutRequest,
    ) -> Result<OrderConfirmation, ApiError> {
        self.create_guest_order(order).await
    }
}
