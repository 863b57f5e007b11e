//! Hearthwood storefront library.
//!
//! The client side of the Hearthwood shop: a guest cart kept in local
//! storage, the cart-to-checkout snapshot, checkout submission for guests and
//! logged-in users, and the REST client the screens talk to.
//!
//! [`Storefront`] wires everything over one [`storage::KeyValueStore`]; the
//! `hw` binary and the integration tests both start there.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod forms;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::{AppError, Result};
pub use routes::Redirect;
pub use state::Storefront;
