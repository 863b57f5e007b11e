//! REST client behaviour against the mock backend: headers, caching, auth
//! and the order endpoints.

#![allow(clippy::unwrap_used)]

use hearthwood_core::{CategoryId, OrderId, OrderStatus, ProductId, ReviewId};
use hearthwood_integration_tests::{MockBackend, VALID_PASSWORD, VALID_TOKEN, product_json};
use hearthwood_storefront::api::{ApiError, LoginRequest, ProductQuery, RegisterRequest};
use hearthwood_storefront::forms::{PasswordChangeForm, ProfileForm, ReviewForm, TrackingForm};
use hearthwood_storefront::storage::{KeyValueStore, keys};
use hearthwood_storefront::{AppError, Redirect};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;

fn login_request(password: &str) -> LoginRequest {
    LoginRequest {
        username: "willow".to_string(),
        password: SecretString::from(password),
    }
}

fn shipped_order() -> serde_json::Value {
    json!({
        "order_id": 40,
        "status": "shipped",
        "total_amount": "35.50",
        "order_date": "2026-09-30T10:00:00Z",
        "payment_method": "cash_on_delivery",
        "email": "guest@example.com",
        "full_name": "Guest Shopper",
        "shipping_address": "1 Alder Rd",
        "items": [
            { "product_id": 1, "product_name": "Oak Table", "quantity": 1, "price_at_purchase": "30.00" },
            { "product_id": 2, "product_name": "Walnut Lamp", "quantity": 1, "price_at_purchase": "5.50" },
        ],
    })
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_list_products_sends_filters() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    backend.put_product(product_json(2, "Walnut Lamp", "5.50", 0));
    let (app, _) = backend.storefront().unwrap();

    let query = ProductQuery {
        search: Some("oak table".to_string()),
        category_id: Some(CategoryId::new(1)),
        min_price: Some(Decimal::from(5)),
        page: Some(2),
        ..ProductQuery::default()
    };
    let page = app.api().list_products(&query).await.unwrap();
    assert_eq!(page.products.len(), 2);
    assert_eq!(page.total, 2);
    assert!(page.products.get(1).unwrap().is_out_of_stock());

    let requests = backend.requests_to("GET", "/api/products");
    let query = requests.first().unwrap().query.as_deref().unwrap();
    assert_eq!(query, "search=oak+table&category_id=1&min_price=5&page=2");
}

#[tokio::test]
async fn test_product_details_are_cached() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();
    let id = ProductId::from(1);

    let first = app.api().get_product(&id).await.unwrap();
    let second = app.api().get_product(&id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.requests_to("GET", "/api/products/1").len(), 1);

    app.api().invalidate_product(&id).await;
    app.api().get_product(&id).await.unwrap();
    assert_eq!(backend.requests_to("GET", "/api/products/1").len(), 2);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();

    let err = app.api().get_product(&ProductId::from(99)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.server_message(), Some("Product not found"));
}

#[tokio::test]
async fn test_list_categories() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();

    let categories = app.api().list_categories().await.unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories.get(1).unwrap().description.as_deref(), Some("Lamps and sconces"));
}

#[tokio::test]
async fn test_every_request_has_a_unique_request_id() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();

    app.api().list_categories().await.unwrap();
    app.api().list_categories().await.unwrap();

    let ids: Vec<String> = backend
        .requests()
        .into_iter()
        .map(|r| r.request_id.unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids.first(), ids.get(1));
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_login_stores_session_and_profile_uses_it() {
    let backend = MockBackend::start().await.unwrap();
    let (app, storage) = backend.storefront().unwrap();

    let response = app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();
    assert_eq!(response.user.unwrap().username, "willow");
    assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some(VALID_TOKEN));
    assert_eq!(app.session().current_user().unwrap().email.as_deref(), Some("willow@example.com"));

    let profile = app.api().profile().await.unwrap();
    assert_eq!(profile.username, "willow");
    let requests = backend.requests_to("GET", "/api/users/profile");
    assert_eq!(
        requests.first().unwrap().authorization.as_deref(),
        Some("Bearer valid-token")
    );

    app.api().logout().unwrap();
    assert!(!app.session().is_authenticated());
    assert_eq!(storage.get(keys::USER).unwrap(), None);
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();

    let err = app.api().login(&login_request("wrong-password")).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert!(!app.session().is_authenticated());
}

#[tokio::test]
async fn test_register_logs_in() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();

    let request = RegisterRequest {
        username: "rowan".to_string(),
        email: "rowan@example.com".to_string(),
        password: SecretString::from("hunter22"),
        full_name: "Rowan Ash".to_string(),
        phone: None,
    };
    let response = app.api().register(&request).await.unwrap();
    assert!(response.has_token());
    assert!(app.session().is_authenticated());

    let requests = backend.requests_to("POST", "/api/users/register");
    let body = &requests.first().unwrap().body;
    assert_eq!(body["password"], "hunter22");
    assert!(body.get("phone").is_none());
}

#[tokio::test]
async fn test_unauthorized_request_clears_session() {
    let backend = MockBackend::start().await.unwrap();
    let (app, storage) = backend.storefront().unwrap();
    app.session()
        .store(&SecretString::from("expired-token"), None)
        .unwrap();
    storage.set(keys::GUEST_CART, r#"[{"product_id":1,"quantity":1}]"#).unwrap();

    let err = AppError::from(app.api().list_orders().await.unwrap_err());
    assert_eq!(err.redirect(), Some(Redirect::Login));
    assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
    // Only the session is cleared.
    assert!(storage.get(keys::GUEST_CART).unwrap().is_some());
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_order_history_and_cancel() {
    let backend = MockBackend::start().await.unwrap();
    let mut pending = shipped_order();
    pending["status"] = json!("pending");
    backend.put_order(pending);
    let (app, _) = backend.storefront().unwrap();
    app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();

    let orders = app.api().list_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert!(order.can_cancel());
    assert_eq!(order.items.first().unwrap().line_total().amount(), Decimal::from(30));

    app.api().cancel_order(OrderId::new(40)).await.unwrap();
    let order = app.api().get_order(OrderId::new(40)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(!order.can_cancel());

    let err = app.api().cancel_order(OrderId::new(40)).await.unwrap_err();
    assert_eq!(err.server_message(), Some("Order cannot be cancelled"));
}

#[tokio::test]
async fn test_track_guest_order() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_order(shipped_order());
    let (app, _) = backend.storefront().unwrap();

    let (id, email) = TrackingForm {
        order_id: "#40".to_string(),
        email: "guest@example.com".to_string(),
    }
    .validate()
    .unwrap();
    let order = app.api().track_order(id, &email).await.unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
    assert_eq!(order.total_amount.amount(), Decimal::new(3550, 2));

    let requests = backend.requests_to("GET", "/api/orders/track/40");
    assert_eq!(
        requests.first().unwrap().query.as_deref(),
        Some("email=guest%40example.com")
    );
    assert_eq!(requests.first().unwrap().authorization, None);
}

#[tokio::test]
async fn test_track_with_wrong_email_is_not_found() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_order(shipped_order());
    let (app, _) = backend.storefront().unwrap();

    let (id, email) = TrackingForm {
        order_id: "40".to_string(),
        email: "someone@example.com".to_string(),
    }
    .validate()
    .unwrap();
    let err = app.api().track_order(id, &email).await.unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Account Settings
// ============================================================================

#[tokio::test]
async fn test_update_profile_refreshes_stored_user() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();
    app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();

    let update = ProfileForm {
        full_name: "Willow Greene".to_string(),
        email: "willow.greene@example.com".to_string(),
        phone: String::new(),
    }
    .validate()
    .unwrap();
    app.api().update_profile(&update).await.unwrap();

    let user = app.session().current_user().unwrap();
    assert_eq!(user.full_name.as_deref(), Some("Willow Greene"));
    assert_eq!(user.email.as_deref(), Some("willow.greene@example.com"));

    let profile = app.api().profile().await.unwrap();
    assert_eq!(profile.email.as_deref(), Some("willow.greene@example.com"));
    let requests = backend.requests_to("PUT", "/api/users/profile");
    assert!(requests.first().unwrap().body.get("phone").is_none());
}

#[tokio::test]
async fn test_change_password() {
    let backend = MockBackend::start().await.unwrap();
    let (app, _) = backend.storefront().unwrap();
    app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();

    let form = |current: &str| PasswordChangeForm {
        current_password: SecretString::from(current),
        new_password: SecretString::from("cedar-99"),
        confirm_password: SecretString::from("cedar-99"),
    };

    let err = app
        .api()
        .change_password(&form("not-it").validate().unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.server_message(), Some("Current password is incorrect"));
    // A rejected change is not a session problem.
    assert!(app.session().is_authenticated());

    app.api()
        .change_password(&form(VALID_PASSWORD).validate().unwrap())
        .await
        .unwrap();
    app.api().logout().unwrap();

    assert!(app.api().login(&login_request(VALID_PASSWORD)).await.is_err());
    app.api().login(&login_request("cedar-99")).await.unwrap();
}

// ============================================================================
// Reviews
// ============================================================================

#[tokio::test]
async fn test_review_lifecycle_updates_product_rating() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();
    app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();
    let id = ProductId::from(1);

    assert_eq!(app.api().get_product(&id).await.unwrap().rating_summary(), None);

    let review = ReviewForm {
        rating: 4,
        review_text: " Sturdy and handsome ".to_string(),
    }
    .validate()
    .unwrap();
    app.api().add_review(&id, &review).await.unwrap();

    let requests = backend.requests_to("POST", "/api/products/1/reviews");
    assert_eq!(
        requests.first().unwrap().body,
        json!({ "rating": 4, "review_text": "Sturdy and handsome" })
    );

    let reviews = app.api().product_reviews(&id).await.unwrap();
    assert_eq!(reviews.len(), 1);
    let first = reviews.first().unwrap();
    assert_eq!(first.author(), "Willow Reed");
    assert_eq!(first.text(), Some("Sturdy and handsome"));

    // The cached detail was dropped, so the new average shows.
    let product = app.api().get_product(&id).await.unwrap();
    assert_eq!(product.rating_summary().as_deref(), Some("★★★★☆ 4.0 (1 review)"));
    assert_eq!(backend.requests_to("GET", "/api/products/1").len(), 2);

    let lower = ReviewForm {
        rating: 2,
        review_text: String::new(),
    }
    .validate()
    .unwrap();
    app.api().update_review(&id, first.review_id, &lower).await.unwrap();
    let product = app.api().get_product(&id).await.unwrap();
    assert_eq!(product.average_rating, Some(Decimal::from(2)));

    app.api().delete_review(&id, first.review_id).await.unwrap();
    assert!(app.api().product_reviews(&id).await.unwrap().is_empty());
    assert_eq!(backend.product("1").unwrap()["review_count"], "0");
}

#[tokio::test]
async fn test_second_review_is_rejected_with_server_message() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();
    app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();
    let id = ProductId::from(1);
    let review = ReviewForm {
        rating: 5,
        review_text: String::new(),
    }
    .validate()
    .unwrap();

    app.api().add_review(&id, &review).await.unwrap();
    let err = AppError::from(app.api().add_review(&id, &review).await.unwrap_err());
    assert_eq!(err.user_message(), "You have already reviewed this product");
}

#[tokio::test]
async fn test_review_requires_login() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();
    let review = ReviewForm {
        rating: 3,
        review_text: String::new(),
    }
    .validate()
    .unwrap();

    let err = app.api().add_review(&ProductId::from(1), &review).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(AppError::from(err).redirect(), Some(Redirect::Login));
}

#[tokio::test]
async fn test_editing_a_missing_review_is_not_found() {
    let backend = MockBackend::start().await.unwrap();
    backend.put_product(product_json(1, "Oak Table", "10.00", 5));
    let (app, _) = backend.storefront().unwrap();
    app.api().login(&login_request(VALID_PASSWORD)).await.unwrap();

    let err = app
        .api()
        .delete_review(&ProductId::from(1), ReviewId::new(99))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
