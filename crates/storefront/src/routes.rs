//! Navigation targets.
//!
//! The storefront library never renders anything itself; actions that end in
//! navigation return a [`Redirect`] and the front end decides what that means.

use std::fmt;

/// A view the user is sent to after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Redirect {
    /// Product listing.
    Products,
    /// Cart page.
    Cart,
    /// Checkout page.
    Checkout,
    /// The logged-in user's order history.
    Orders,
    /// Login page.
    Login,
}

impl Redirect {
    /// Path of the view in the web storefront.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Products => "/products",
            Self::Cart => "/cart",
            Self::Checkout => "/checkout",
            Self::Orders => "/orders",
            Self::Login => "/login",
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
