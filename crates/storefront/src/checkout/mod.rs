//! Checkout: the cart snapshot handoff, optional re-validation, and the
//! submission flow for guests and logged-in users.

mod handoff;
mod page;
mod revalidate;

pub use handoff::{CheckoutData, CheckoutHandoff, CheckoutSource};
pub use page::{CheckoutPage, CheckoutState, MountHandle};
pub use revalidate::{Discrepancy, revalidate};

pub use crate::forms::{CheckoutForm, ValidationError};
