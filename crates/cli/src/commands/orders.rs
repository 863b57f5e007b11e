//! `hw orders` and `hw track`.

use hearthwood_core::OrderId;
use hearthwood_storefront::api::Order;
use hearthwood_storefront::forms::TrackingForm;
use hearthwood_storefront::{AppError, Result, Storefront};

#[allow(clippy::print_stdout)]
pub async fn list(app: &Storefront) -> Result<()> {
    let orders = app.api().list_orders().await?;
    if orders.is_empty() {
        println!("You have no orders yet");
        return Ok(());
    }
    for order in &orders {
        println!(
            "#{:<6} {:<12} {:>10}  {}",
            order.order_id,
            order.status,
            order.total_amount,
            order.order_date.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn show(app: &Storefront, id: OrderId) -> Result<()> {
    let order = app.api().get_order(id).await?;
    print_order(&order);
    Ok(())
}

/// Cancel an order. Only pending orders are sent to the backend.
#[allow(clippy::print_stdout)]
pub async fn cancel(app: &Storefront, id: OrderId) -> Result<()> {
    let order = app.api().get_order(id).await?;
    if !order.can_cancel() {
        println!("Order #{id} is {} and can no longer be cancelled", order.status);
        return Ok(());
    }
    app.api().cancel_order(id).await?;
    println!("Order #{id} cancelled");
    Ok(())
}

/// Guest order lookup.
pub async fn track(app: &Storefront, order_id: String, email: String) -> Result<()> {
    let (id, email) = TrackingForm { order_id, email }.validate()?;
    let order = app.api().track_order(id, &email).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound(format!("Order #{id} for {email}"))
        } else {
            AppError::from(e)
        }
    })?;
    print_order(&order);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    println!("Order #{} ({})", order.order_id, order.status);
    if let Some(date) = &order.order_date {
        println!("  Placed:   {date}");
    }
    if let Some(name) = &order.full_name {
        println!("  Name:     {name}");
    }
    if let Some(address) = &order.shipping_address {
        println!("  Ship to:  {address}");
    }
    println!(
        "  Payment:  {}",
        order.payment_method.as_deref().unwrap_or("cash_on_delivery")
    );
    for item in &order.items {
        println!(
            "  {:<32} {:>4} x = {:>10}",
            item.product_name.as_deref().unwrap_or("(unknown product)"),
            item.quantity,
            item.line_total()
        );
    }
    println!("  Total:    {}", order.total_amount);
}
