//! The guest cart.
//!
//! A guest cart is an ordered set of [`CartLine`]s keyed by [`ProductId`]. It
//! carries only ids and quantities; names, prices and stock come from the
//! catalog when the cart is displayed.
//!
//! # Invariants
//!
//! - At most one line per product id.
//! - Every line has `quantity >= 1`. Setting a quantity below one removes the
//!   line instead.
//!
//! Both hold for every value produced by this module, including values parsed
//! from stored JSON: lines with non-positive quantities are dropped and
//! duplicate ids are merged on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::ProductId;

/// One entry in the guest cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// When the product was first added. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// Fields written by other code paths (for example display fields copied
    /// into the cart by an older client). Preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartLine {
    /// Create a new line.
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            product_id,
            quantity,
            added_at: Some(added_at),
            extra: Map::new(),
        }
    }
}

/// Stored line shape before invariants are applied.
#[derive(Deserialize)]
struct StoredLine {
    product_id: ProductId,
    quantity: i64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    added_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Accept any RFC 3339 timestamp; anything else becomes `None` rather than
/// failing the whole cart.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// The full guest cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GuestCart {
    lines: Vec<CartLine>,
}

impl<'de> Deserialize<'de> for GuestCart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let stored = Vec::<StoredLine>::deserialize(deserializer)?;
        let mut cart = Self::default();
        for line in stored {
            let Ok(quantity) = u32::try_from(line.quantity) else {
                continue;
            };
            if quantity == 0 {
                continue;
            }
            match cart.position(&line.product_id) {
                Some(idx) => {
                    if let Some(existing) = cart.lines.get_mut(idx) {
                        existing.quantity = existing.quantity.saturating_add(quantity);
                    }
                }
                None => cart.lines.push(CartLine {
                    product_id: line.product_id,
                    quantity,
                    added_at: line.added_at,
                    extra: line.extra,
                }),
            }
        }
        Ok(cart)
    }
}

impl GuestCart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Parse a stored cart.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is not an array of lines.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// True if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| &l.product_id == product_id)
    }

    /// Add `quantity` units of a product.
    ///
    /// Increments the existing line if there is one, otherwise appends a new
    /// line stamped with `now`. Adding zero units is a no-op.
    ///
    /// Returns `true` if the cart changed.
    pub fn add(&mut self, product_id: ProductId, quantity: u32, now: DateTime<Utc>) -> bool {
        if quantity == 0 {
            return false;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine::new(product_id, quantity, now));
        }
        true
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity below one removes the line. Products not in the cart are
    /// left alone (no line is created).
    ///
    /// Returns `true` if the cart changed.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) -> bool {
        let Some(idx) = self.position(product_id) else {
            return false;
        };
        match u32::try_from(quantity) {
            Ok(q) if q >= 1 => match self.lines.get_mut(idx) {
                Some(line) if line.quantity != q => {
                    line.quantity = q;
                    true
                }
                _ => false,
            },
            _ => {
                self.lines.remove(idx);
                true
            }
        }
    }

    /// Remove the line for a product, if present.
    ///
    /// Returns `true` if a line was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.product_id != product_id);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
