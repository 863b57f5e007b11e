//! Optional price and stock re-check before an order is submitted.
//!
//! The checkout snapshot is a point-in-time copy of what the cart page
//! showed. When enabled, this module compares it against the catalog right
//! before submission so the shopper sees changes instead of a backend
//! rejection. It never modifies the snapshot or the cart.

use std::fmt;

use hearthwood_core::{CartSummary, Price, ProductId, format_amount};
use tracing::{debug, instrument};

use crate::api::{ApiError, ProductCatalog};

/// One way a snapshot line no longer matches the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    /// The unit price changed.
    PriceChanged {
        product_id: ProductId,
        name: String,
        was: Price,
        now: Price,
    },
    /// Fewer units are in stock than the line asks for.
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: i64,
    },
    /// The product no longer exists.
    Unavailable { product_id: ProductId },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceChanged { name, was, now, .. } => write!(
                f,
                "price of {name} changed from {} to {}",
                format_amount(was.amount()),
                format_amount(now.amount())
            ),
            Self::InsufficientStock {
                name,
                requested,
                available,
                ..
            } => write!(f, "only {available} of {name} left (you asked for {requested})"),
            Self::Unavailable { product_id } => {
                write!(f, "product {product_id} is no longer available")
            }
        }
    }
}

/// Compare every snapshot line against the catalog.
///
/// Lines without a snapshot price (rebuilt from the raw cart) are only
/// checked for stock and availability.
///
/// # Errors
///
/// Returns an error if the catalog cannot be reached. A 404 for a product is
/// not an error; it is reported as [`Discrepancy::Unavailable`].
#[instrument(skip_all, fields(items = summary.items.len()))]
pub async fn revalidate(
    catalog: &dyn ProductCatalog,
    summary: &CartSummary,
) -> Result<Vec<Discrepancy>, ApiError> {
    let mut found = Vec::new();
    for item in &summary.items {
        let product = match catalog.product(&item.product_id).await {
            Ok(product) => product,
            Err(e) if e.is_not_found() => {
                found.push(Discrepancy::Unavailable {
                    product_id: item.product_id.clone(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(was) = item.price
            && was != product.price
        {
            found.push(Discrepancy::PriceChanged {
                product_id: item.product_id.clone(),
                name: product.product_name.clone(),
                was,
                now: product.price,
            });
        }

        if let Some(available) = product.stock_quantity
            && available < i64::from(item.quantity)
        {
            found.push(Discrepancy::InsufficientStock {
                product_id: item.product_id.clone(),
                name: product.product_name.clone(),
                requested: item.quantity,
                available,
            });
        }
    }
    debug!(discrepancies = found.len(), "Snapshot re-validated");
    Ok(found)
}
