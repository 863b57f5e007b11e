//! Storefront state shared by every screen.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError, LiveCatalog};
use crate::cart::{CartBadge, CartEvents, CartPage, CartStore};
use crate::checkout::{CheckoutHandoff, CheckoutPage};
use crate::config::StorefrontConfig;
use crate::error::{AppError, Result};
use crate::session::AuthSession;
use crate::storage::{FileStore, KeyValueStore};

/// Application state shared across all screens.
///
/// Cheaply cloneable via `Arc`. Every handle inside shares the same storage
/// and the same cart change channel.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    storage: Arc<dyn KeyValueStore>,
    cart: CartStore,
    session: AuthSession,
    api: ApiClient,
    handoff: CheckoutHandoff,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_base_url", &self.inner.config.api_base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Open the file store named by the configuration and build the state on
    /// top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file cannot be opened or the HTTP
    /// client cannot be built.
    pub fn open(config: StorefrontConfig) -> Result<Self> {
        let storage = FileStore::open(&config.storage_path)?;
        tracing::debug!(path = %storage.path().display(), "Storage opened");
        Self::with_storage(config, Arc::new(storage)).map_err(AppError::from)
    }

    /// Build the state over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> std::result::Result<Self, ApiError> {
        let cart = CartStore::new(storage.clone(), CartEvents::new());
        let session = AuthSession::new(storage.clone());
        let api = ApiClient::new(&config, session.clone())?;
        let handoff = CheckoutHandoff::new(storage.clone(), cart.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                storage,
                cart,
                session,
                api,
                handoff,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.storage
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn handoff(&self) -> &CheckoutHandoff {
        &self.inner.handoff
    }

    /// A fresh cart page. Call [`CartPage::load`] before reading it.
    #[must_use]
    pub fn cart_page(&self) -> CartPage {
        CartPage::new(
            self.inner.cart.clone(),
            Arc::new(self.inner.api.clone()),
            self.inner.handoff.clone(),
        )
    }

    /// Mount the checkout page, with catalog re-validation when configured.
    #[must_use]
    pub fn checkout_page(&self) -> CheckoutPage {
        let page = CheckoutPage::mount(
            self.inner.handoff.clone(),
            Arc::new(self.inner.api.clone()),
            self.inner.session.clone(),
        );
        if self.inner.config.revalidate_at_checkout {
            page.with_revalidation(Arc::new(LiveCatalog(self.inner.api.clone())))
        } else {
            page
        }
    }

    /// A cart count badge subscribed to this state's cart.
    #[must_use]
    pub fn cart_badge(&self) -> CartBadge {
        CartBadge::mount(self.inner.cart.clone())
    }
}
