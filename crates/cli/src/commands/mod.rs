//! Command implementations.
//!
//! Each command prints plain text to stdout. Errors are returned to `main`,
//! which prints the user-facing message.

pub mod account;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod reviews;

use hearthwood_core::{Price, SummaryItem};

/// Print summary lines followed by the unit count and total.
#[allow(clippy::print_stdout)]
pub fn print_items(items: &[SummaryItem], item_count: u64, total: Price) {
    for item in items {
        let name = item.product_name.as_deref().unwrap_or("(unknown product)");
        let unit = item.price.map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "  {:<8} {:<32} {:>4} x {:>10} = {:>10}",
            item.product_id,
            name,
            item.quantity,
            unit,
            item.line_total()
        );
    }
    println!("  {item_count} item(s), total {total}");
}
