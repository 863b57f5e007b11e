//! Persistent key-value storage.
//!
//! The storefront keeps all client-held state (guest cart, checkout snapshot,
//! auth token) in a durable, synchronous, string-keyed store. There are no
//! transactions and no expiry; each key has exactly one owning module:
//!
//! | Key | Owner |
//! |---|---|
//! | [`keys::GUEST_CART`] | [`crate::cart::CartStore`] |
//! | [`keys::CHECKOUT_DATA`] | [`crate::checkout::CheckoutHandoff`] |
//! | [`keys::TOKEN`], [`keys::USER`] | [`crate::session::AuthSession`] |
//!
//! Writes are last-write-wins. Two processes sharing one [`FileStore`] can
//! overwrite each other's values.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Storage keys.
pub mod keys {
    /// Guest cart: JSON array of cart lines.
    pub const GUEST_CART: &str = "guestCart";

    /// Checkout snapshot: JSON `{ items, total, itemCount }`.
    pub const CHECKOUT_DATA: &str = "checkoutData";

    /// Bearer token for authenticated requests.
    pub const TOKEN: &str = "token";

    /// JSON profile of the logged-in user.
    pub const USER: &str = "user";
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the store lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Durable string-keyed storage.
///
/// All operations are synchronous; a successful `set` is visible to every
/// subsequent `get` on the same store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read a key, folding backend errors into "absent".
///
/// Readers of persisted state must never fail because of it; a broken store
/// looks like an empty one.
pub(crate) fn read_lenient(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read storage key, treating as absent");
            None
        }
    }
}
