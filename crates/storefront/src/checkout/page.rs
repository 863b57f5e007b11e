//! The checkout page and its submission state machine.
//!
//! ```text
//! Idle ──submit──► Validating ──ok──► Submitting ──2xx──► Succeeded
//!                     │                   │
//!                     └──rule fails──┐    └──error──┐
//!                                    ▼              ▼
//!                                  Failed ◄─────────┘
//! ```
//!
//! `Failed` accepts another submit, same as `Idle`. Stored cart state is only
//! removed after the backend confirmed the order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearthwood_core::CartSummary;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

use super::handoff::{CheckoutData, CheckoutHandoff, CheckoutSource};
use super::revalidate::revalidate;
use crate::api::{
    ApiError, GuestCheckoutRequest, OrderConfirmation, OrderGateway, OrderLineRequest,
    OrderRequest, ProductCatalog,
};
use crate::error::add_breadcrumb;
use crate::forms::{CheckoutForm, ValidationError};
use crate::routes::Redirect;
use crate::session::AuthSession;

/// Shown when the backend gave no usable message.
const ORDER_FAILED_MESSAGE: &str = "Failed to create order";

/// Submission progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Validating,
    Submitting,
    /// The order exists. `redirect` is the orders list for members and the
    /// login page for guests, whose account was just created.
    Succeeded {
        redirect: Redirect,
        confirmation: OrderConfirmation,
    },
    /// Nothing was stored or cleared. `redirect` is set when the failure
    /// requires leaving the page (an expired session).
    Failed {
        message: String,
        redirect: Option<Redirect>,
    },
}

/// Shared flag telling an in-flight submission whether its page still exists.
#[derive(Debug, Clone)]
pub struct MountHandle(Arc<AtomicBool>);

impl MountHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Mark the page as gone.
    pub fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The checkout page.
pub struct CheckoutPage {
    handoff: CheckoutHandoff,
    gateway: Arc<dyn OrderGateway>,
    session: AuthSession,
    catalog: Option<Arc<dyn ProductCatalog>>,
    data: CheckoutData,
    state: CheckoutState,
    mounted: MountHandle,
}

impl std::fmt::Debug for CheckoutPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutPage")
            .field("source", &self.data.source)
            .field("state", &self.state)
            .field("mounted", &self.mounted.is_mounted())
            .finish_non_exhaustive()
    }
}

impl CheckoutPage {
    /// Mount the page: read the summary it works from.
    #[must_use]
    pub fn mount(handoff: CheckoutHandoff, gateway: Arc<dyn OrderGateway>, session: AuthSession) -> Self {
        let data = handoff.load();
        info!(source = ?data.source, items = data.summary.items.len(), "Checkout page mounted");
        Self {
            handoff,
            gateway,
            session,
            catalog: None,
            data,
            state: CheckoutState::Idle,
            mounted: MountHandle::new(),
        }
    }

    /// Re-check prices and stock against `catalog` before each submission.
    #[must_use]
    pub fn with_revalidation(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub const fn summary(&self) -> &CartSummary {
        &self.data.summary
    }

    #[must_use]
    pub const fn source(&self) -> CheckoutSource {
        self.data.source
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// True if the order will be placed for a logged-in user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// A handle that can unmount the page while a submission is running.
    #[must_use]
    pub fn mount_handle(&self) -> MountHandle {
        self.mounted.clone()
    }

    pub fn unmount(&self) {
        self.mounted.unmount();
    }

    /// Validate the form and place the order.
    ///
    /// On success both `guestCart` and `checkoutData` are removed. On any
    /// failure stored state is left exactly as it was. If the page was
    /// unmounted while the request was in flight, the page state is left
    /// alone; a successful order still clears the stored cart.
    #[instrument(skip_all, fields(source = ?self.data.source))]
    pub async fn submit(&mut self, form: &CheckoutForm) -> &CheckoutState {
        let authenticated = self.session.is_authenticated();

        self.state = CheckoutState::Validating;
        if let Err(e) = form.validate(self.data.summary.is_empty(), authenticated) {
            info!(error = %e, "Checkout form rejected");
            return self.fail(e.to_string(), None);
        }

        if let Some(catalog) = self.catalog.clone() {
            match revalidate(catalog.as_ref(), &self.data.summary).await {
                Ok(found) if found.is_empty() => {}
                Ok(found) => {
                    if !self.mounted.is_mounted() {
                        return &self.state;
                    }
                    let message = ValidationError::StaleCart(found).to_string();
                    return self.fail(message, None);
                }
                Err(e) => {
                    if !self.mounted.is_mounted() {
                        return &self.state;
                    }
                    let redirect = login_redirect(&e);
                    return self.fail(e.user_message("Failed to verify your cart"), redirect);
                }
            }
        }

        self.state = CheckoutState::Submitting;
        let result = if authenticated {
            self.gateway.place_order(&self.member_request(form)).await
        } else {
            self.gateway.guest_checkout(&self.guest_request(form)).await
        };

        match result {
            Ok(confirmation) => {
                // The order exists server-side; clear local state even if the
                // page is gone.
                if let Err(e) = self.handoff.complete() {
                    error!(error = %e, "Order placed but stored cart could not be cleared");
                }
                add_breadcrumb("checkout", "Checkout succeeded", None);
                if !self.mounted.is_mounted() {
                    info!("Checkout page unmounted before order completed");
                    return &self.state;
                }
                let redirect = if authenticated {
                    Redirect::Orders
                } else {
                    Redirect::Login
                };
                info!(order_id = ?confirmation.order_id, %redirect, "Checkout succeeded");
                self.state = CheckoutState::Succeeded {
                    redirect,
                    confirmation,
                };
                &self.state
            }
            Err(e) => {
                warn!(error = %e, "Order submission failed");
                if !self.mounted.is_mounted() {
                    return &self.state;
                }
                let redirect = login_redirect(&e);
                self.fail(e.user_message(ORDER_FAILED_MESSAGE), redirect)
            }
        }
    }

    fn fail(&mut self, message: String, redirect: Option<Redirect>) -> &CheckoutState {
        self.state = CheckoutState::Failed { message, redirect };
        &self.state
    }

    fn lines(&self) -> Vec<OrderLineRequest> {
        self.data
            .summary
            .items
            .iter()
            .map(|item| OrderLineRequest {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect()
    }

    fn member_request(&self, form: &CheckoutForm) -> OrderRequest {
        OrderRequest {
            shipping_address: form.shipping_address.trim().to_string(),
            cart_items: self.lines(),
            total_amount: self.data.summary.total_amount(),
        }
    }

    fn guest_request(&self, form: &CheckoutForm) -> GuestCheckoutRequest {
        GuestCheckoutRequest {
            username: form.username.trim().to_string(),
            password: SecretString::from(form.password.expose_secret()),
            full_name: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            shipping_address: form.shipping_address.trim().to_string(),
            cart_items: self.lines(),
            total_amount: self.data.summary.total_amount(),
        }
    }
}

const fn login_redirect(e: &ApiError) -> Option<Redirect> {
    match e {
        ApiError::Unauthorized => Some(Redirect::Login),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use hearthwood_core::{OrderId, ProductId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::Product;
    use crate::cart::{CartEvents, CartStore};
    use crate::storage::{KeyValueStore, MemoryStore, keys};

    const SNAPSHOT: &str = r#"{"items":[{"product_id":1,"quantity":2,"product_name":"Chair","price":"10"},{"product_id":2,"quantity":1,"product_name":"Lamp","price":"5"}],"total":"25","itemCount":3}"#;
    const CART: &str = r#"[{"product_id":1,"quantity":2},{"product_id":2,"quantity":1}]"#;

    #[derive(Default)]
    struct Recorded {
        member: Vec<OrderRequest>,
        guest: Vec<serde_json::Value>,
    }

    struct FakeGateway {
        outcome: fn() -> Result<OrderConfirmation, ApiError>,
        recorded: Mutex<Recorded>,
        on_submit: Option<MountHandle>,
    }

    impl FakeGateway {
        fn new(outcome: fn() -> Result<OrderConfirmation, ApiError>) -> Self {
            Self {
                outcome,
                recorded: Mutex::new(Recorded::default()),
                on_submit: None,
            }
        }

        fn respond(&self) -> Result<OrderConfirmation, ApiError> {
            if let Some(handle) = &self.on_submit {
                handle.unmount();
            }
            (self.outcome)()
        }
    }

    #[async_trait]
    impl OrderGateway for FakeGateway {
        async fn place_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError> {
            self.recorded.lock().unwrap().member.push(order.clone());
            self.respond()
        }

        async fn guest_checkout(
            &self,
            order: &GuestCheckoutRequest,
        ) -> Result<OrderConfirmation, ApiError> {
            self.recorded
                .lock()
                .unwrap()
                .guest
                .push(serde_json::to_value(order).unwrap());
            self.respond()
        }
    }

    fn created() -> Result<OrderConfirmation, ApiError> {
        Ok(OrderConfirmation {
            order_id: Some(OrderId::new(31)),
            ..OrderConfirmation::default()
        })
    }

    fn rejected() -> Result<OrderConfirmation, ApiError> {
        Err(ApiError::Api {
            status: 400,
            message: Some("Insufficient stock for Chair".to_string()),
        })
    }

    fn offline() -> Result<OrderConfirmation, ApiError> {
        Err(ApiError::Timeout)
    }

    fn storage(token: bool) -> Arc<MemoryStore> {
        let mut values = vec![(keys::CHECKOUT_DATA, SNAPSHOT), (keys::GUEST_CART, CART)];
        if token {
            values.push((keys::TOKEN, "tok"));
        }
        Arc::new(MemoryStore::with_values(values))
    }

    fn page(storage: &Arc<MemoryStore>, gateway: Arc<FakeGateway>) -> CheckoutPage {
        let cart = CartStore::new(storage.clone(), CartEvents::new());
        let handoff = CheckoutHandoff::new(storage.clone(), cart);
        CheckoutPage::mount(handoff, gateway, AuthSession::new(storage.clone()))
    }

    fn guest_form() -> CheckoutForm {
        CheckoutForm {
            username: "willow".to_string(),
            password: SecretString::from("secret1"),
            full_name: "Willow Reed".to_string(),
            email: "willow@example.com".to_string(),
            phone: "555-0111".to_string(),
            shipping_address: "9 Cedar Ct".to_string(),
        }
    }

    // =========================================================================
    // Success
    // =========================================================================

    #[tokio::test]
    async fn test_guest_success_clears_keys_and_redirects_to_login() {
        let storage = storage(false);
        let gateway = Arc::new(FakeGateway::new(created));
        let mut page = page(&storage, gateway.clone());

        let state = page.submit(&guest_form()).await.clone();
        assert!(matches!(state, CheckoutState::Succeeded { redirect: Redirect::Login, .. }));
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        assert_eq!(storage.get(keys::CHECKOUT_DATA).unwrap(), None);

        let recorded = gateway.recorded.lock().unwrap();
        let body = recorded.guest.first().unwrap();
        assert_eq!(body["username"], "willow");
        assert_eq!(body["full_name"], "Willow Reed");
        assert_eq!(body["cart_items"][1]["product_id"], 2);
        assert_eq!(body["total_amount"], 25.0);
    }

    #[tokio::test]
    async fn test_member_success_redirects_to_orders() {
        let storage = storage(true);
        let gateway = Arc::new(FakeGateway::new(created));
        let mut page = page(&storage, gateway.clone());

        let state = page.submit(&CheckoutForm::for_member("9 Cedar Ct")).await.clone();
        assert!(matches!(state, CheckoutState::Succeeded { redirect: Redirect::Orders, .. }));
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        assert_eq!(storage.get(keys::CHECKOUT_DATA).unwrap(), None);

        let recorded = gateway.recorded.lock().unwrap();
        let order = recorded.member.first().unwrap();
        assert_eq!(order.total_amount, Decimal::from(25));
        assert_eq!(order.cart_items.len(), 2);
        assert_eq!(order.cart_items.first().unwrap().product_id, ProductId::from(1));
    }

    // =========================================================================
    // Failure
    // =========================================================================

    #[tokio::test]
    async fn test_backend_error_keeps_keys_and_shows_message() {
        let storage = storage(false);
        let mut page = page(&storage, Arc::new(FakeGateway::new(rejected)));

        let state = page.submit(&guest_form()).await.clone();
        assert_eq!(
            state,
            CheckoutState::Failed {
                message: "Insufficient stock for Chair".to_string(),
                redirect: None,
            }
        );
        assert_eq!(storage.get(keys::GUEST_CART).unwrap().as_deref(), Some(CART));
        assert_eq!(storage.get(keys::CHECKOUT_DATA).unwrap().as_deref(), Some(SNAPSHOT));
    }

    #[tokio::test]
    async fn test_timeout_uses_generic_message_and_allows_retry() {
        let storage = storage(false);
        let gateway = Arc::new(FakeGateway::new(offline));
        let mut page = page(&storage, gateway.clone());

        page.submit(&guest_form()).await;
        assert!(matches!(
            page.state(),
            CheckoutState::Failed { message, .. } if message == "Failed to create order"
        ));

        page.submit(&guest_form()).await;
        assert_eq!(gateway.recorded.lock().unwrap().guest.len(), 2);
        assert_eq!(storage.get(keys::GUEST_CART).unwrap().as_deref(), Some(CART));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_request() {
        let storage = storage(false);
        let gateway = Arc::new(FakeGateway::new(created));
        let mut page = page(&storage, gateway.clone());

        let form = CheckoutForm {
            username: "wi".to_string(),
            ..guest_form()
        };
        page.submit(&form).await;
        assert!(matches!(
            page.state(),
            CheckoutState::Failed { message, .. } if message == "Username must be at least 3 characters"
        ));
        assert!(gateway.recorded.lock().unwrap().guest.is_empty());
        assert_eq!(storage.get(keys::CHECKOUT_DATA).unwrap().as_deref(), Some(SNAPSHOT));
    }

    #[tokio::test]
    async fn test_empty_checkout_is_blocked() {
        let storage = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::new(created));
        let mut page = page(&storage, gateway.clone());
        assert_eq!(page.source(), CheckoutSource::Empty);

        page.submit(&guest_form()).await;
        assert!(matches!(
            page.state(),
            CheckoutState::Failed { message, .. } if message == "Your cart is empty"
        ));
        assert!(gateway.recorded.lock().unwrap().guest.is_empty());
    }

    // =========================================================================
    // Unmount
    // =========================================================================

    #[tokio::test]
    async fn test_unmounted_success_still_clears_storage() {
        let storage = storage(false);
        let cart = CartStore::new(storage.clone(), CartEvents::new());
        let handoff = CheckoutHandoff::new(storage.clone(), cart);
        let mut gateway = FakeGateway::new(created);
        let mounted = MountHandle::new();
        gateway.on_submit = Some(mounted.clone());
        let mut page = CheckoutPage::mount(handoff, Arc::new(gateway), AuthSession::new(storage.clone()));
        page.mounted = mounted;

        let state = page.submit(&guest_form()).await.clone();
        assert_eq!(state, CheckoutState::Submitting);
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        assert_eq!(storage.get(keys::CHECKOUT_DATA).unwrap(), None);
    }

    #[tokio::test]
    async fn test_unmounted_failure_leaves_state() {
        let storage = storage(false);
        let cart = CartStore::new(storage.clone(), CartEvents::new());
        let handoff = CheckoutHandoff::new(storage.clone(), cart);
        let mut gateway = FakeGateway::new(rejected);
        let mounted = MountHandle::new();
        gateway.on_submit = Some(mounted.clone());
        let mut page = CheckoutPage::mount(handoff, Arc::new(gateway), AuthSession::new(storage.clone()));
        page.mounted = mounted;

        assert_eq!(page.submit(&guest_form()).await, &CheckoutState::Submitting);
        assert_eq!(storage.get(keys::GUEST_CART).unwrap().as_deref(), Some(CART));
    }

    // =========================================================================
    // Re-validation
    // =========================================================================

    struct RepricedCatalog;

    #[async_trait]
    impl ProductCatalog for RepricedCatalog {
        async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
            Ok(Product {
                product_id: id.clone(),
                product_name: "Chair".to_string(),
                description: None,
                price: hearthwood_core::Price::new(Decimal::from(12)),
                image_url: None,
                images: Vec::new(),
                stock_quantity: Some(10),
                category_id: None,
                category_name: None,
                average_rating: None,
                review_count: None,
            })
        }
    }

    #[tokio::test]
    async fn test_revalidation_blocks_stale_snapshot() {
        let storage = storage(false);
        let gateway = Arc::new(FakeGateway::new(created));
        let mut page = page(&storage, gateway.clone()).with_revalidation(Arc::new(RepricedCatalog));

        page.submit(&guest_form()).await;
        assert!(matches!(
            page.state(),
            CheckoutState::Failed { message, .. } if message.starts_with("Some items in your cart have changed")
        ));
        assert!(gateway.recorded.lock().unwrap().guest.is_empty());
        assert_eq!(storage.get(keys::CHECKOUT_DATA).unwrap().as_deref(), Some(SNAPSHOT));
    }
}
