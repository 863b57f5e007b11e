//! The cart page: the enriched view of the guest cart.

use std::sync::Arc;

use hearthwood_core::{CartSummary, Price, ProductId, SummaryItem};
use tracing::{debug, instrument, warn};

use super::CartStore;
use crate::api::{Product, ProductCatalog};
use crate::checkout::{CheckoutHandoff, ValidationError};
use crate::error::{AppError, Result};
use crate::routes::Redirect;

/// Cart lines joined with catalog details, plus the total and unit count.
///
/// Call [`CartPage::load`] after construction and whenever the cart may have
/// changed underneath the page.
pub struct CartPage {
    store: CartStore,
    catalog: Arc<dyn ProductCatalog>,
    handoff: CheckoutHandoff,
    summary: CartSummary,
}

impl std::fmt::Debug for CartPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPage")
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl CartPage {
    #[must_use]
    pub fn new(store: CartStore, catalog: Arc<dyn ProductCatalog>, handoff: CheckoutHandoff) -> Self {
        Self {
            store,
            catalog,
            handoff,
            summary: CartSummary::empty(),
        }
    }

    /// Read the cart and fetch details for each line.
    ///
    /// A line whose product cannot be fetched is left out of the view. It
    /// stays in the stored cart.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> &[SummaryItem] {
        let cart = self.store.get_cart().cart;
        let mut items = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            match self.catalog.product(&line.product_id).await {
                Ok(product) => items.push(enrich(&line.product_id, line.quantity, &product)),
                Err(e) => warn!(product_id = %line.product_id, error = %e, "Error loading product, hiding line"),
            }
        }
        debug!(lines = cart.lines().len(), shown = items.len(), "Cart page loaded");
        self.summary = CartSummary::from_items(items);
        for item in self.summary.unpriceable_items() {
            warn!(product_id = %item.product_id, "Line total overflows, left out of cart total");
        }
        &self.summary.items
    }

    /// Enriched lines as last loaded.
    #[must_use]
    pub fn items(&self) -> &[SummaryItem] {
        &self.summary.items
    }

    /// Sum of price times quantity over the shown lines.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.summary.total
    }

    /// Units over the shown lines.
    #[must_use]
    pub const fn item_count(&self) -> u64 {
        self.summary.item_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    /// Change a line's quantity. Quantities below one are ignored here; use
    /// [`Self::remove_item`] to drop a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> Result<()> {
        if quantity < 1 {
            return Ok(());
        }
        self.store.update_cart_item(product_id, quantity)?;
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let mut items = std::mem::take(&mut self.summary.items);
        for item in items.iter_mut().filter(|i| &i.product_id == product_id) {
            item.quantity = quantity;
        }
        self.summary = CartSummary::from_items(items);
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<()> {
        self.store.remove_from_cart(product_id)?;
        let mut items = std::mem::take(&mut self.summary.items);
        items.retain(|i| &i.product_id != product_id);
        self.summary = CartSummary::from_items(items);
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub fn clear(&mut self) -> Result<()> {
        self.store.clear_cart()?;
        self.summary = CartSummary::empty();
        Ok(())
    }

    /// Snapshot the shown cart for checkout and return where to go next.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCart`] (and writes nothing) if no
    /// lines are shown, or a storage error if the snapshot cannot be written.
    #[instrument(skip(self), fields(items = self.summary.items.len()))]
    pub fn proceed_to_checkout(&self) -> Result<Redirect> {
        if self.summary.is_empty() {
            return Err(AppError::from(ValidationError::EmptyCart));
        }
        self.handoff.write(&self.summary)?;
        Ok(Redirect::Checkout)
    }
}

fn enrich(product_id: &ProductId, quantity: u32, product: &Product) -> SummaryItem {
    SummaryItem {
        product_id: product_id.clone(),
        quantity,
        product_name: Some(product.product_name.clone()),
        description: product.description.clone(),
        price: Some(product.price),
        image_url: product.primary_image_url().map(str::to_owned),
        stock_quantity: product.stock_quantity,
    }
}
