//! `hw cart` commands.

use hearthwood_core::ProductId;
use hearthwood_storefront::{Result, Storefront};

use super::print_items;

/// Show the cart with current catalog details.
#[allow(clippy::print_stdout)]
pub async fn show(app: &Storefront) -> Result<()> {
    let stored = app.cart().get_cart();
    let mut page = app.cart_page();
    page.load().await;

    if page.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    println!("Cart:");
    print_items(page.items(), page.item_count(), page.total());
    if page.item_count() < stored.count {
        println!(
            "  ({} item(s) could not be loaded and are not shown)",
            stored.count - page.item_count()
        );
    }
    Ok(())
}

/// Add a product after checking that it exists and is in stock.
#[allow(clippy::print_stdout)]
pub async fn add(app: &Storefront, product_id: ProductId, quantity: u32) -> Result<()> {
    let product = app.api().get_product(&product_id).await?;
    if product.is_out_of_stock() {
        println!("{} is out of stock", product.product_name);
        return Ok(());
    }
    let contents = app.cart().add_to_cart(product_id, quantity)?;
    println!(
        "Added {quantity} x {} to your cart ({} item(s))",
        product.product_name, contents.count
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn update(app: &Storefront, product_id: &ProductId, quantity: i64) -> Result<()> {
    let contents = app.cart().update_cart_item(product_id, quantity)?;
    println!("Cart updated ({} item(s))", contents.count);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn remove(app: &Storefront, product_id: &ProductId) -> Result<()> {
    let contents = app.cart().remove_from_cart(product_id)?;
    println!("Removed {product_id} ({} item(s) left)", contents.count);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn clear(app: &Storefront) -> Result<()> {
    app.cart().clear_cart()?;
    println!("Cart cleared");
    Ok(())
}

/// Load the cart page and write the checkout snapshot.
pub async fn proceed(app: &Storefront) -> Result<()> {
    let mut page = app.cart_page();
    page.load().await;
    page.proceed_to_checkout()?;
    Ok(())
}
