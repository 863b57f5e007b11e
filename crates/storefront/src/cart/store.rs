//! The guest cart store.
//!
//! [`CartStore`] is the only code that reads or writes the `guestCart` key.
//! Each mutation runs read, modify, persist, notify in that order while
//! holding the store's lock, except for the notify step. Subscribers
//! therefore always read the value that raised their signal (or a newer one).

use std::sync::{Arc, Mutex};

use chrono::Utc;
use hearthwood_core::{GuestCart, ProductId};
use tracing::{info, instrument, warn};

use super::events::CartEvents;
use crate::error::add_breadcrumb;
use crate::storage::{KeyValueStore, StorageError, keys, read_lenient};

/// The raw cart plus its unit count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartContents {
    pub cart: GuestCart,
    /// Sum of quantities over all lines.
    pub count: u64,
}

impl From<GuestCart> for CartContents {
    fn from(cart: GuestCart) -> Self {
        let count = cart.count();
        Self { cart, count }
    }
}

/// Handle to the persisted guest cart.
///
/// Cheap to clone; all clones share the same storage, lock and event channel.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    storage: Arc<dyn KeyValueStore>,
    events: CartEvents,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("subscribers", &self.inner.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store over `storage`, raising signals on `events`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, events: CartEvents) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                storage,
                events,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// The channel this store raises [`super::CartUpdated`] on.
    #[must_use]
    pub fn events(&self) -> &CartEvents {
        &self.inner.events
    }

    /// Read the cart.
    ///
    /// Never fails: a missing key, an unreadable store, or malformed JSON all
    /// read as an empty cart.
    #[must_use]
    pub fn get_cart(&self) -> CartContents {
        self.load().into()
    }

    fn load(&self) -> GuestCart {
        let Some(text) = read_lenient(self.inner.storage.as_ref(), keys::GUEST_CART) else {
            return GuestCart::new();
        };
        GuestCart::from_json(&text).unwrap_or_else(|e| {
            warn!(error = %e, "Stored guest cart is malformed, treating as empty");
            GuestCart::new()
        })
    }

    /// Apply `f` to the cart and persist the result if `f` returns `true`.
    /// Notifies subscribers after a successful write.
    fn mutate<F>(&self, action: &str, f: F) -> Result<CartContents, StorageError>
    where
        F: FnOnce(&mut GuestCart) -> bool,
    {
        let contents = {
            let _guard = self
                .inner
                .write_lock
                .lock()
                .map_err(|_| StorageError::Poisoned)?;
            let mut cart = self.load();
            if !f(&mut cart) {
                return Ok(cart.into());
            }
            self.inner
                .storage
                .set(keys::GUEST_CART, &cart.to_json()?)?;
            CartContents::from(cart)
        };

        self.inner.events.notify();
        let count = contents.count.to_string();
        add_breadcrumb("cart", action, Some(&[("count", count.as_str())]));
        Ok(contents)
    }

    /// Add `quantity` units of a product (increments an existing line).
    ///
    /// No stock check happens here; the backend validates stock when the
    /// order is submitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartContents, StorageError> {
        let contents = self.mutate("Added to cart", |cart| {
            cart.add(product_id, quantity, Utc::now())
        })?;
        info!(count = contents.count, "Product added to cart");
        Ok(contents)
    }

    /// Set a line's quantity. A quantity below one removes the line.
    /// Products not in the cart are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartContents, StorageError> {
        self.mutate("Updated cart item", |cart| {
            if cart.get(product_id).is_none() {
                return false;
            }
            cart.set_quantity(product_id, quantity);
            true
        })
    }

    /// Remove a product's line. Removing an absent product is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub fn remove_from_cart(&self, product_id: &ProductId) -> Result<CartContents, StorageError> {
        self.mutate("Removed from cart", |cart| {
            cart.remove(product_id);
            true
        })
    }

    /// Persist an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) -> Result<(), StorageError> {
        self.mutate("Cleared cart", |cart| {
            cart.clear();
            true
        })?;
        info!("Cart cleared");
        Ok(())
    }

    /// Delete the `guestCart` key entirely. Used once an order has been
    /// placed, so no trace of the cart remains.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    #[instrument(skip(self))]
    pub fn discard(&self) -> Result<(), StorageError> {
        {
            let _guard = self
                .inner
                .write_lock
                .lock()
                .map_err(|_| StorageError::Poisoned)?;
            self.inner.storage.remove(keys::GUEST_CART)?;
        }
        self.inner.events.notify();
        add_breadcrumb("cart", "Discarded cart", None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn fixture() -> (Arc<MemoryStore>, CartStore) {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::new(storage.clone(), CartEvents::new());
        (storage, store)
    }

    fn quantity_of(store: &CartStore, id: &ProductId) -> Option<u32> {
        store.get_cart().cart.get(id).map(|l| l.quantity)
    }

    // =========================================================================
    // Read Tests
    // =========================================================================

    #[test]
    fn test_missing_key_is_empty() {
        let (_, store) = fixture();
        let contents = store.get_cart();
        assert!(contents.cart.is_empty());
        assert_eq!(contents.count, 0);
    }

    #[test]
    fn test_malformed_value_is_empty() {
        let storage = Arc::new(MemoryStore::with_values([(keys::GUEST_CART, "{oops")]));
        let store = CartStore::new(storage, CartEvents::new());
        assert_eq!(store.get_cart(), CartContents::default());
    }

    #[test]
    fn test_malformed_value_is_overwritten_by_next_add() {
        let storage = Arc::new(MemoryStore::with_values([(keys::GUEST_CART, "null")]));
        let store = CartStore::new(storage, CartEvents::new());
        let contents = store.add_to_cart(ProductId::from(1), 1).unwrap();
        assert_eq!(contents.count, 1);
    }

    // =========================================================================
    // Mutation Tests
    // =========================================================================

    #[test]
    fn test_adds_for_same_product_sum() {
        let (_, store) = fixture();
        store.add_to_cart(ProductId::from("A"), 2).unwrap();
        store.add_to_cart(ProductId::from("A"), 3).unwrap();

        let contents = store.get_cart();
        assert_eq!(contents.cart.lines().len(), 1);
        assert_eq!(quantity_of(&store, &ProductId::from("A")), Some(5));
    }

    #[test]
    fn test_update_to_zero_or_negative_removes() {
        let (_, store) = fixture();
        store.add_to_cart(ProductId::from(1), 2).unwrap();
        store.add_to_cart(ProductId::from(2), 2).unwrap();

        store.update_cart_item(&ProductId::from(1), 0).unwrap();
        store.update_cart_item(&ProductId::from(2), -1).unwrap();

        assert!(store.get_cart().cart.is_empty());
    }

    #[test]
    fn test_update_sets_quantity() {
        let (_, store) = fixture();
        store.add_to_cart(ProductId::from(1), 2).unwrap();
        let contents = store.update_cart_item(&ProductId::from(1), 9).unwrap();
        assert_eq!(contents.count, 9);
    }

    #[test]
    fn test_update_absent_product_does_not_write_or_notify() {
        let (storage, store) = fixture();
        let mut sub = store.events().subscribe();
        store.update_cart_item(&ProductId::from(5), 3).unwrap();
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        assert!(!sub.take_pending());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_, store) = fixture();
        store.add_to_cart(ProductId::from(1), 1).unwrap();
        store.add_to_cart(ProductId::from(2), 1).unwrap();

        store.remove_from_cart(&ProductId::from(1)).unwrap();
        let once = store.get_cart();
        store.remove_from_cart(&ProductId::from(1)).unwrap();
        store.remove_from_cart(&ProductId::from(42)).unwrap();
        assert_eq!(store.get_cart(), once);
    }

    #[test]
    fn test_clear_then_get_is_empty() {
        let (storage, store) = fixture();
        store.add_to_cart(ProductId::from("A"), 2).unwrap();
        store.add_to_cart(ProductId::from("B"), 1).unwrap();
        store.clear_cart().unwrap();

        let contents = store.get_cart();
        assert!(contents.cart.is_empty());
        assert_eq!(contents.count, 0);
        assert_eq!(storage.get(keys::GUEST_CART).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_discard_removes_key() {
        let (storage, store) = fixture();
        store.add_to_cart(ProductId::from(1), 1).unwrap();
        store.discard().unwrap();
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        assert_eq!(store.get_cart().count, 0);
    }

    #[test]
    fn test_every_mutation_notifies() {
        let (_, store) = fixture();
        let mut sub = store.events().subscribe();

        store.add_to_cart(ProductId::from(1), 1).unwrap();
        assert!(sub.take_pending());
        store.update_cart_item(&ProductId::from(1), 4).unwrap();
        assert!(sub.take_pending());
        store.remove_from_cart(&ProductId::from(1)).unwrap();
        assert!(sub.take_pending());
        store.clear_cart().unwrap();
        assert!(sub.take_pending());
        store.discard().unwrap();
        assert!(sub.take_pending());
    }

    #[test]
    fn test_persisted_lines_carry_added_at() {
        let (storage, store) = fixture();
        store.add_to_cart(ProductId::from(3), 1).unwrap();
        let raw = storage.get(keys::GUEST_CART).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json[0]["added_at"].is_string());
        assert_eq!(json[0]["product_id"], serde_json::json!(3));
    }
}
