//! The checkout snapshot.
//!
//! A [`CartSummary`] is computed once, when the shopper leaves the cart page
//! for checkout. It carries the enriched line items together with the total
//! and unit count the cart page showed, so checkout can render and submit
//! without another catalog round-trip. It is never recomputed against the
//! catalog after creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cart::CartLine;
use crate::types::{Price, ProductId};

/// A cart line enriched with catalog details.
///
/// Display fields are optional: an item rebuilt from a raw cart line has only
/// whatever fields that line happened to carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
}

impl SummaryItem {
    /// Build an item from a raw cart line, picking up any display fields the
    /// line already carries.
    #[must_use]
    pub fn from_cart_line(line: &CartLine) -> Self {
        let text = |key: &str| line.extra.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            product_name: text("product_name"),
            description: text("description"),
            price: line
                .extra
                .get("price")
                .and_then(|v| serde_json::from_value::<Price>(v.clone()).ok()),
            image_url: text("image_url"),
            stock_quantity: line.extra.get("stock_quantity").and_then(Value::as_i64),
        }
    }

    /// Price times quantity. An item without a price, or whose total does
    /// not fit in a [`Price`], contributes nothing.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.checked_line_total().unwrap_or(Price::ZERO)
    }

    /// Price times quantity, or `None` if the product overflows.
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Price> {
        self.price.unwrap_or(Price::ZERO).checked_times(self.quantity)
    }

    /// True if the item has the catalog fields checkout displays.
    #[must_use]
    pub const fn is_enriched(&self) -> bool {
        self.product_name.is_some() && self.price.is_some()
    }
}

/// Snapshot handed from the cart page to checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub items: Vec<SummaryItem>,
    /// Missing in some stored snapshots; read as zero.
    #[serde(default)]
    pub total: Price,
    /// Total number of units. Older snapshots spelled this `count`.
    #[serde(rename = "itemCount", alias = "count", default)]
    pub item_count: u64,
}

impl CartSummary {
    /// Build a summary, computing `total` and `item_count` from the items.
    ///
    /// A line whose amount overflows, alone or added to the running total, is
    /// left out of `total` as if it had no price.
    #[must_use]
    pub fn from_items(items: Vec<SummaryItem>) -> Self {
        let total = items.iter().fold(Price::ZERO, |total, item| {
            item.checked_line_total()
                .and_then(|line| total.checked_add(line))
                .unwrap_or(total)
        });
        let item_count = items.iter().map(|i| u64::from(i.quantity)).sum();
        Self {
            items,
            total,
            item_count,
        }
    }

    /// A summary with no items.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }

    /// Items whose amount overflowed and were left out of `total`.
    pub fn unpriceable_items(&self) -> impl Iterator<Item = &SummaryItem> {
        self.items.iter().filter(|i| i.checked_line_total().is_none())
    }

    /// True if there is nothing to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total amount as a plain decimal.
    #[must_use]
    pub const fn total_amount(&self) -> Decimal {
        self.total.amount()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn item(id: i64, quantity: u32, price: i64) -> SummaryItem {
        SummaryItem {
            product_id: ProductId::from(id),
            quantity,
            product_name: Some(format!("Product {id}")),
            description: None,
            price: Some(Price::new(Decimal::from(price))),
            image_url: None,
            stock_quantity: Some(10),
        }
    }

    #[test]
    fn test_from_items_computes_total_and_count() {
        let summary = CartSummary::from_items(vec![item(1, 2, 10), item(2, 1, 5)]);
        assert_eq!(summary.total_amount(), Decimal::from(25));
        assert_eq!(summary.item_count, 3);
    }

    #[test]
    fn test_overflowing_line_is_left_out_of_total() {
        let mut huge = item(1, 2, 0);
        huge.price = Some(Price::new(Decimal::MAX));
        let summary = CartSummary::from_items(vec![huge, item(2, 1, 5)]);
        assert_eq!(summary.total_amount(), Decimal::from(5));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.unpriceable_items().count(), 1);
        assert_eq!(summary.items.first().unwrap().line_total(), Price::ZERO);
    }

    #[test]
    fn test_overflowing_running_total_skips_line() {
        let mut first = item(1, 1, 0);
        first.price = Some(Price::new(Decimal::MAX));
        let mut second = item(2, 1, 0);
        second.price = Some(Price::new(Decimal::MAX));
        let summary = CartSummary::from_items(vec![first, second]);
        assert_eq!(summary.total_amount(), Decimal::MAX);
    }

    #[test]
    fn test_serializes_item_count_camel_case() {
        let summary = CartSummary::from_items(vec![item(1, 1, 10)]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["itemCount"], json!(1));
        assert!(json.get("item_count").is_none());
    }

    #[test]
    fn test_reads_legacy_count_and_numeric_total() {
        let summary: CartSummary = serde_json::from_value(json!({
            "items": [{"product_id": 4, "quantity": 2, "price": 12.5, "product_name": "Stool"}],
            "total": 25,
            "count": 2
        }))
        .unwrap();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total_amount(), Decimal::from(25));
        assert!(summary.items.first().unwrap().is_enriched());
    }

    #[test]
    fn test_item_from_bare_cart_line_has_no_display_fields() {
        let line = CartLine::new(ProductId::from(8), 3, Utc::now());
        let item = SummaryItem::from_cart_line(&line);
        assert_eq!(item.quantity, 3);
        assert!(!item.is_enriched());
        assert_eq!(item.line_total(), Price::ZERO);
    }

    #[test]
    fn test_item_from_cart_line_picks_up_carried_fields() {
        let mut line = CartLine::new(ProductId::from(8), 2, Utc::now());
        line.extra.insert("product_name".into(), json!("Bench"));
        line.extra.insert("price".into(), json!("30.00"));
        let item = SummaryItem::from_cart_line(&line);
        assert!(item.is_enriched());
        assert_eq!(item.line_total().amount(), Decimal::from(60));
    }
}
