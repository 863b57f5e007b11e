//! Cart store, change notifications and the cart page over real storage
//! and the mock catalog.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use hearthwood_core::{GuestCart, ProductId};
use hearthwood_integration_tests::{MockBackend, product_json};
use hearthwood_storefront::Storefront;
use hearthwood_storefront::storage::{FileStore, KeyValueStore, keys};
use rust_decimal::Decimal;

// ============================================================================
// Cart Page
// ============================================================================

#[tokio::test]
async fn test_cart_page_hides_missing_products() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();

    app.cart().add_to_cart(ProductId::from(1), 1).unwrap();
    app.cart().add_to_cart(ProductId::from(404), 2).unwrap();

    let mut page = app.cart_page();
    let items = page.load().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().unwrap().product_name.as_deref(), Some("Oak Table"));
    assert_eq!(page.total().amount(), Decimal::from(10));

    // The unresolved line stays in the stored cart.
    assert_eq!(app.cart().get_cart().count, 3);
}

#[tokio::test]
async fn test_string_and_numeric_ids_are_distinct_lines() {
    let backend = MockBackend::start().await.unwrap();
    let (app, storage) = backend.storefront().unwrap();

    app.cart().add_to_cart(ProductId::from(1), 1).unwrap();
    app.cart().add_to_cart(ProductId::from("1"), 1).unwrap();
    app.cart().add_to_cart(ProductId::from(1), 2).unwrap();

    let cart = GuestCart::from_json(&storage.get(keys::GUEST_CART).unwrap().unwrap()).unwrap();
    assert_eq!(cart.lines().len(), 2);
    assert_eq!(cart.get(&ProductId::from(1)).unwrap().quantity, 3);
    assert_eq!(cart.get(&ProductId::from("1")).unwrap().quantity, 1);
}

#[tokio::test]
async fn test_corrupt_cart_reads_as_empty_and_is_replaced() {
    let backend = MockBackend::start().await.unwrap();
    let (app, storage) = backend.storefront().unwrap();
    storage.set(keys::GUEST_CART, "{not json").unwrap();

    assert!(app.cart().get_cart().cart.is_empty());
    let contents = app.cart().add_to_cart(ProductId::from(5), 1).unwrap();
    assert_eq!(contents.count, 1);
    assert!(GuestCart::from_json(&storage.get(keys::GUEST_CART).unwrap().unwrap()).is_ok());
}

// ============================================================================
// Change Notifications
// ============================================================================

#[tokio::test]
async fn test_badge_follows_every_mutation() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();
    let mut badge = app.cart_badge();
    assert_eq!(badge.count(), 0);

    app.cart().add_to_cart(ProductId::from(1), 2).unwrap();
    assert_eq!(badge.next_count().await, Some(2));

    app.cart().update_cart_item(&ProductId::from(1), 5).unwrap();
    assert_eq!(badge.next_count().await, Some(5));

    app.cart().remove_from_cart(&ProductId::from(1)).unwrap();
    assert_eq!(badge.next_count().await, Some(0));
}

#[tokio::test]
async fn test_successful_checkout_resets_badge() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();
    app.cart().add_to_cart(ProductId::from(1), 2).unwrap();

    let mut badge = app.cart_badge();
    assert_eq!(badge.sync(), 2);

    let mut page = app.checkout_page();
    page.submit(&hearthwood_storefront::checkout::CheckoutForm {
        username: "willow".to_string(),
        password: secrecy::SecretString::from("secret1"),
        full_name: "Willow Reed".to_string(),
        email: "willow@example.com".to_string(),
        phone: "555-0111".to_string(),
        shipping_address: "9 Cedar Ct".to_string(),
    })
    .await;

    assert_eq!(badge.sync(), 0);
}

// ============================================================================
// File Storage
// ============================================================================

#[tokio::test]
async fn test_cart_survives_restart_with_file_store() {
    let backend = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");

    {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
        let app = Storefront::with_storage(backend.config(), storage).unwrap();
        app.cart().add_to_cart(ProductId::from(8), 3).unwrap();
    }

    let mut config = backend.config();
    config.storage_path = path;
    let app = Storefront::open(config).unwrap();
    assert_eq!(app.cart().get_cart().count, 3);
}
