//! `hw reviews`.

use hearthwood_core::{ProductId, ReviewId};
use hearthwood_storefront::forms::ReviewForm;
use hearthwood_storefront::{Result, Storefront};

#[allow(clippy::print_stdout)]
pub async fn list(app: &Storefront, product_id: &ProductId) -> Result<()> {
    let reviews = app.api().product_reviews(product_id).await?;
    if reviews.is_empty() {
        println!("No reviews yet. Be the first to review!");
        return Ok(());
    }
    for review in &reviews {
        let date = review.created_at.as_deref().map_or("N/A", |d| d.get(..10).unwrap_or(d));
        println!("#{:<5} {} {:<24} {date}", review.review_id, review.rating, review.author());
        if let Some(text) = review.text() {
            println!("       {text}");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn add(app: &Storefront, product_id: &ProductId, form: &ReviewForm) -> Result<()> {
    let request = form.validate()?;
    app.api().add_review(product_id, &request).await?;
    println!("Review added successfully!");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn update(
    app: &Storefront,
    product_id: &ProductId,
    review_id: ReviewId,
    form: &ReviewForm,
) -> Result<()> {
    let request = form.validate()?;
    app.api().update_review(product_id, review_id, &request).await?;
    println!("Review #{review_id} updated");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn delete(app: &Storefront, product_id: &ProductId, review_id: ReviewId) -> Result<()> {
    app.api().delete_review(product_id, review_id).await?;
    println!("Review #{review_id} deleted");
    Ok(())
}
