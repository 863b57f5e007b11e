//! Guest cart: persisted store, change notifications, and the cart page.
//!
//! # Data flow
//!
//! ```text
//! user action ──► CartStore ──persist──► guestCart key
//!                    │
//!                    └──notify──► CartEvents ──► CartBadge / CartPage re-read
//! ```
//!
//! The cart itself holds only product ids and quantities. [`CartPage`]
//! enriches lines with catalog details for display and produces the checkout
//! snapshot.

mod events;
mod page;
mod store;

pub use events::{CartBadge, CartEvents, CartSubscription, CartUpdated};
pub use page::CartPage;
pub use store::{CartContents, CartStore};
