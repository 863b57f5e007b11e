//! `hw products`.

use hearthwood_core::ProductId;
use hearthwood_storefront::api::ProductQuery;
use hearthwood_storefront::{Result, Storefront};

#[allow(clippy::print_stdout)]
pub async fn list(app: &Storefront, query: &ProductQuery) -> Result<()> {
    let page = app.api().list_products(query).await?;
    if page.products.is_empty() {
        println!("No products found");
        return Ok(());
    }
    for product in &page.products {
        let stock = if product.is_out_of_stock() { "  (out of stock)" } else { "" };
        println!(
            "{:<8} {:<40} {:>10}{stock}",
            product.product_id, product.product_name, product.price
        );
    }
    println!("Page {} of {} ({} products)", page.page, page.total_pages, page.total);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show(app: &Storefront, id: &ProductId) -> Result<()> {
    let product = app.api().get_product(id).await?;
    println!("{} ({})", product.product_name, product.product_id);
    println!("  Price:    {}", product.price);
    match product.rating_summary() {
        Some(rating) => println!("  Rating:   {rating}"),
        None => println!("  Rating:   no reviews yet"),
    }
    if let Some(category) = &product.category_name {
        println!("  Category: {category}");
    }
    match product.stock_quantity {
        Some(n) if n > 0 => println!("  In stock: {n}"),
        Some(_) => println!("  Out of stock"),
        None => {}
    }
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(app: &Storefront) -> Result<()> {
    for category in app.api().list_categories().await? {
        println!("{:<6} {}", category.category_id, category.category_name);
    }
    Ok(())
}
