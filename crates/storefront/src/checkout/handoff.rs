//! The cart-to-checkout snapshot.
//!
//! [`CheckoutHandoff`] is the only code that reads or writes `checkoutData`.
//! The cart page writes the snapshot once; checkout reads it back with this
//! priority:
//!
//! 1. a `checkoutData` snapshot that parses
//! 2. a summary rebuilt from the raw `guestCart`
//! 3. an empty summary, which blocks submission
//!
//! The two keys are never updated together, so checkout may see a newer cart
//! than the snapshot. The snapshot wins.

use std::sync::Arc;

use hearthwood_core::{CartSummary, SummaryItem};
use tracing::{debug, info, warn};

use crate::cart::CartStore;
use crate::storage::{KeyValueStore, StorageError, keys, read_lenient};

/// Where the checkout summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutSource {
    /// The cart page's snapshot.
    Snapshot,
    /// Rebuilt from raw cart lines. Items carry only the display fields the
    /// lines happened to store, so names and prices may be missing.
    RawCart,
    /// Nothing to check out.
    Empty,
}

/// The summary checkout works from.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutData {
    pub summary: CartSummary,
    pub source: CheckoutSource,
}

/// Handle to the `checkoutData` key.
#[derive(Clone)]
pub struct CheckoutHandoff {
    storage: Arc<dyn KeyValueStore>,
    cart: CartStore,
}

impl std::fmt::Debug for CheckoutHandoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutHandoff").finish_non_exhaustive()
    }
}

impl CheckoutHandoff {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, cart: CartStore) -> Self {
        Self { storage, cart }
    }

    /// Persist a snapshot, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub fn write(&self, summary: &CartSummary) -> Result<(), StorageError> {
        let text = serde_json::to_string(summary)?;
        self.storage.set(keys::CHECKOUT_DATA, &text)?;
        info!(
            items = summary.items.len(),
            item_count = summary.item_count,
            total = %summary.total,
            "Checkout snapshot written"
        );
        Ok(())
    }

    /// Read the summary checkout should show. Never fails.
    #[must_use]
    pub fn load(&self) -> CheckoutData {
        if let Some(text) = read_lenient(self.storage.as_ref(), keys::CHECKOUT_DATA) {
            match serde_json::from_str::<CartSummary>(&text) {
                Ok(mut summary) => {
                    summary.items.retain(|i| i.quantity > 0);
                    debug!(items = summary.items.len(), "Using checkout snapshot");
                    return CheckoutData {
                        summary,
                        source: CheckoutSource::Snapshot,
                    };
                }
                Err(e) => warn!(error = %e, "Checkout snapshot is malformed, falling back to cart"),
            }
        }

        let cart = self.cart.get_cart().cart;
        if cart.is_empty() {
            return CheckoutData {
                summary: CartSummary::empty(),
                source: CheckoutSource::Empty,
            };
        }

        let items: Vec<SummaryItem> = cart.lines().iter().map(SummaryItem::from_cart_line).collect();
        if items.iter().any(|i| !i.is_enriched()) {
            warn!("Rebuilt checkout summary has lines without name or price");
        }
        let summary = CartSummary::from_items(items);
        for item in summary.unpriceable_items() {
            warn!(product_id = %item.product_id, "Stored price overflows line total, treating line as unpriced");
        }
        CheckoutData {
            summary,
            source: CheckoutSource::RawCart,
        }
    }

    /// Remove the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::CHECKOUT_DATA)
    }

    /// Drop both the snapshot and the cart after an order was placed.
    ///
    /// Both removals are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first removal error.
    pub fn complete(&self) -> Result<(), StorageError> {
        let snapshot = self.clear();
        let cart = self.cart.discard();
        snapshot.and(cart)
    }
}
