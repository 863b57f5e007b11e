//! Integration tests for Hearthwood.
//!
//! [`MockBackend`] serves the backend REST endpoints from memory on
//! `127.0.0.1:0` and records every request it receives, so tests can drive
//! the real [`hearthwood_storefront::api::ApiClient`] end to end and then
//! inspect what went over the wire.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p hearthwood-integration-tests
//! ```
//!
//! # Mock Accounts
//!
//! - `POST /users/login` accepts any username with [`VALID_PASSWORD`] (or the
//!   password last set through `PUT /users/change-password`) and issues
//!   [`VALID_TOKEN`].
//! - Authenticated endpoints accept only `Bearer` [`VALID_TOKEN`] and answer
//!   401 otherwise.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use hearthwood_storefront::api::ApiError;
use hearthwood_storefront::storage::{KeyValueStore, MemoryStore};
use hearthwood_storefront::{Storefront, StorefrontConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// Token issued by the mock login endpoint.
pub const VALID_TOKEN: &str = "valid-token";

/// Password the mock login endpoint accepts.
pub const VALID_PASSWORD: &str = "secret1";

/// Order id assigned to orders created through the mock.
pub const CREATED_ORDER_ID: i64 = 31;

/// A request as the mock received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the `/api` prefix.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    /// JSON body, or `Null` if there was none.
    pub body: Value,
}

/// How the order endpoints answer.
#[derive(Debug, Clone)]
pub enum OrderOutcome {
    /// 201 with `{ message, order_id }`.
    Created,
    /// The given status and JSON body.
    Rejected { status: u16, body: Value },
    /// Wait, then answer as [`OrderOutcome::Created`].
    Delayed(Duration),
}

/// A stored review and the product key it belongs to.
struct StoredReview {
    product: String,
    review: Value,
}

struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    products: Mutex<BTreeMap<String, Value>>,
    orders: Mutex<BTreeMap<i64, Value>>,
    reviews: Mutex<BTreeMap<i64, StoredReview>>,
    outcome: Mutex<OrderOutcome>,
    profile: Mutex<Value>,
    password: Mutex<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            products: Mutex::new(BTreeMap::new()),
            orders: Mutex::new(BTreeMap::new()),
            reviews: Mutex::new(BTreeMap::new()),
            outcome: Mutex::new(OrderOutcome::Created),
            profile: Mutex::new(user_json("willow")),
            password: Mutex::new(VALID_PASSWORD.to_string()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the storefront backend.
///
/// The server task is aborted when the backend is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    base_url: Url,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/api/")).map_err(std::io::Error::other)?;

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log_server_error(&e);
            }
        });

        Ok(Self {
            addr,
            base_url,
            state,
            server,
        })
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the API, ending in `/api/`.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Default configuration pointed at this backend.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::for_base_url(self.base_url.clone())
    }

    /// A storefront over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn storefront(&self) -> Result<(Storefront, Arc<MemoryStore>), ApiError> {
        self.storefront_with(|_| {})
    }

    /// Like [`Self::storefront`], with a chance to adjust the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn storefront_with(
        &self,
        configure: impl FnOnce(&mut StorefrontConfig),
    ) -> Result<(Storefront, Arc<MemoryStore>), ApiError> {
        let mut config = self.config();
        configure(&mut config);
        let storage = Arc::new(MemoryStore::new());
        let app = Storefront::with_storage(config, storage.clone() as Arc<dyn KeyValueStore>)?;
        Ok((app, storage))
    }

    /// Add or replace a catalog product. The key is its `product_id`.
    pub fn put_product(&self, product: Value) {
        let key = match &product["product_id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lock(&self.state.products).insert(key, product);
    }

    /// Add or replace an existing order.
    pub fn put_order(&self, order: Value) {
        if let Some(id) = order["order_id"].as_i64() {
            lock(&self.state.orders).insert(id, order);
        }
    }

    /// A catalog product as currently stored, including rating fields the
    /// review endpoints maintain.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<Value> {
        lock(&self.state.products).get(id).cloned()
    }

    #[must_use]
    pub fn order(&self, id: i64) -> Option<Value> {
        lock(&self.state.orders).get(&id).cloned()
    }

    /// Set how the order endpoints answer from now on.
    pub fn set_order_outcome(&self, outcome: OrderOutcome) {
        *lock(&self.state.outcome) = outcome;
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests received for one method and path (including `/api`).
    #[must_use]
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        lock(&self.state.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[allow(clippy::print_stderr)]
fn log_server_error(error: &std::io::Error) {
    eprintln!("mock backend stopped: {error}");
}

/// Catalog product JSON in the backend's shape.
#[must_use]
pub fn product_json(id: i64, name: &str, price: &str, stock: i64) -> Value {
    json!({
        "product_id": id,
        "product_name": name,
        "description": format!("{name} made from reclaimed wood"),
        "price": price,
        "stock_quantity": stock,
        "image_url": format!("/uploads/{id}.jpg"),
        "images": [],
        "category_id": 1,
        "category_name": "Furniture",
    })
}

// =============================================================================
// Router
// =============================================================================

fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/reviews", get(list_reviews).post(add_review))
        .route(
            "/products/{id}/reviews/{review_id}",
            put(update_review).delete(delete_review),
        )
        .route("/categories", get(list_categories))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/guest-checkout", post(guest_checkout))
        .route("/orders/track/{id}", get(track_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", put(cancel_order))
        .route("/users/login", post(login))
        .route("/users/register", post(register))
        .route("/users/profile", get(profile).put(update_profile))
        .route("/users/change-password", put(change_password));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let header_value = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_owned),
        authorization: header_value(header::AUTHORIZATION.as_str()),
        request_id: header_value("x-request-id"),
        body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
    };
    lock(&state.requests).push(recorded);

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {VALID_TOKEN}"))
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(State(state): State<Arc<MockState>>) -> Json<Value> {
    let products: Vec<Value> = lock(&state.products).values().cloned().collect();
    let total = products.len();
    Json(json!({ "products": products, "total": total, "total_pages": 1 }))
}

async fn get_product(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    match lock(&state.products).get(&id) {
        Some(product) => Json(json!({ "product": product })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn list_categories() -> Json<Value> {
    Json(json!({
        "categories": [
            { "category_id": 1, "category_name": "Furniture" },
            { "category_id": 2, "category_name": "Lighting", "description": "Lamps and sconces" },
        ]
    }))
}

// =============================================================================
// Orders
// =============================================================================

async fn place(state: &MockState, body: &Value) -> Response {
    let outcome = lock(&state.outcome).clone();
    match outcome {
        OrderOutcome::Rejected { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
            (status, Json(body)).into_response()
        }
        OrderOutcome::Delayed(delay) => {
            tokio::time::sleep(delay).await;
            created(state, body)
        }
        OrderOutcome::Created => created(state, body),
    }
}

fn created(state: &MockState, body: &Value) -> Response {
    let order = json!({
        "order_id": CREATED_ORDER_ID,
        "status": "pending",
        "total_amount": body["total_amount"],
        "payment_method": "cash_on_delivery",
        "shipping_address": body["shipping_address"],
        "full_name": body.get("full_name"),
        "email": body.get("email"),
        "items": [],
    });
    lock(&state.orders).insert(CREATED_ORDER_ID, order);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Order created successfully",
            "order_id": CREATED_ORDER_ID,
            "total_amount": body["total_amount"],
        })),
    )
        .into_response()
}

async fn create_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    place(&state, &body).await
}

async fn guest_checkout(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    place(&state, &body).await
}

async fn list_orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    let orders: Vec<Value> = lock(&state.orders).values().cloned().collect();
    Json(json!({ "orders": orders })).into_response()
}

async fn get_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    match lock(&state.orders).get(&id) {
        Some(order) => Json(json!({ "order": order })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn cancel_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    let mut orders = lock(&state.orders);
    let Some(order) = orders.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Order not found");
    };
    if order["status"] != "pending" {
        return error(StatusCode::BAD_REQUEST, "Order cannot be cancelled");
    }
    order["status"] = json!("cancelled");
    Json(json!({ "message": "Order cancelled" })).into_response()
}

#[derive(Deserialize)]
struct TrackQuery {
    email: Option<String>,
}

async fn track_order(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Query(query): Query<TrackQuery>,
) -> Response {
    let Some(email) = query.email else {
        return error(StatusCode::BAD_REQUEST, "Email is required");
    };
    match lock(&state.orders).get(&id) {
        Some(order) if order["email"] == email.as_str() => {
            Json(json!({ "order": order })).into_response()
        }
        _ => error(StatusCode::NOT_FOUND, "Order not found"),
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

fn user_json(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "email": format!("{username}@example.com"),
        "full_name": "Willow Reed",
        "role": "customer",
    })
}

async fn login(State(state): State<Arc<MockState>>, Json(credentials): Json<Credentials>) -> Response {
    if credentials.password != *lock(&state.password) {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    Json(json!({
        "message": "Login successful",
        "token": VALID_TOKEN,
        "user": user_json(&credentials.username),
    }))
    .into_response()
}

async fn register(Json(credentials): Json<Credentials>) -> Response {
    if credentials.password.chars().count() < 6 {
        return error(StatusCode::BAD_REQUEST, "Password must be at least 6 characters");
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": VALID_TOKEN,
            "user": user_json(&credentials.username),
        })),
    )
        .into_response()
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    let user = lock(&state.profile).clone();
    Json(json!({ "user": user })).into_response()
}

async fn update_profile(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    let mut profile = lock(&state.profile);
    for field in ["full_name", "email", "phone"] {
        if let Some(value) = body.get(field) {
            profile[field] = value.clone();
        }
    }
    Json(json!({ "message": "Profile updated successfully" })).into_response()
}

#[derive(Deserialize)]
struct PasswordChange {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<PasswordChange>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    let mut password = lock(&state.password);
    if body.current_password != *password {
        return error(StatusCode::BAD_REQUEST, "Current password is incorrect");
    }
    *password = body.new_password;
    Json(json!({ "message": "Password changed successfully" })).into_response()
}

// =============================================================================
// Reviews
// =============================================================================

/// Recompute a product's `average_rating` and `review_count`. Both are sent
/// as strings, the way a SQL aggregate comes back.
fn refresh_rating(state: &MockState, product: &str) {
    let ratings: Vec<i64> = lock(&state.reviews)
        .values()
        .filter(|r| r.product == product)
        .filter_map(|r| r.review["rating"].as_i64())
        .collect();
    if let Some(entry) = lock(&state.products).get_mut(product) {
        let count = ratings.len();
        let sum: i64 = ratings.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let average = if count == 0 { 0.0 } else { sum as f64 / count as f64 };
        entry["average_rating"] = json!(format!("{average:.2}"));
        entry["review_count"] = json!(count.to_string());
    }
}

async fn list_reviews(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    if !lock(&state.products).contains_key(&id) {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }
    let reviews: Vec<Value> = lock(&state.reviews)
        .values()
        .rev()
        .filter(|r| r.product == id)
        .map(|r| r.review.clone())
        .collect();
    Json(json!({ "reviews": reviews })).into_response()
}

fn valid_rating(body: &Value) -> Option<i64> {
    body["rating"].as_i64().filter(|r| (1..=5).contains(r))
}

async fn add_review(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    if !lock(&state.products).contains_key(&id) {
        return error(StatusCode::NOT_FOUND, "Product not found");
    }
    let Some(rating) = valid_rating(&body) else {
        return error(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5");
    };
    let review_id = {
        let mut reviews = lock(&state.reviews);
        if reviews.values().any(|r| r.product == id) {
            return error(StatusCode::BAD_REQUEST, "You have already reviewed this product");
        }
        let review_id = reviews.keys().next_back().map_or(1, |last| last + 1);
        let profile = lock(&state.profile).clone();
        reviews.insert(
            review_id,
            StoredReview {
                product: id.clone(),
                review: json!({
                    "review_id": review_id,
                    "rating": rating,
                    "review_text": body["review_text"],
                    "user_id": profile["id"],
                    "username": profile["username"],
                    "full_name": profile["full_name"],
                    "created_at": "2026-10-01T12:00:00Z",
                }),
            },
        );
        review_id
    };
    refresh_rating(&state, &id);
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Review added successfully", "review_id": review_id })),
    )
        .into_response()
}

async fn update_review(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((id, review_id)): Path<(String, i64)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    let Some(rating) = valid_rating(&body) else {
        return error(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5");
    };
    {
        let mut reviews = lock(&state.reviews);
        let Some(stored) = reviews.get_mut(&review_id).filter(|r| r.product == id) else {
            return error(StatusCode::NOT_FOUND, "Review not found");
        };
        stored.review["rating"] = json!(rating);
        stored.review["review_text"] = body["review_text"].clone();
    }
    refresh_rating(&state, &id);
    Json(json!({ "message": "Review updated successfully" })).into_response()
}

async fn delete_review(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((id, review_id)): Path<(String, i64)>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }
    {
        let mut reviews = lock(&state.reviews);
        if !reviews.get(&review_id).is_some_and(|r| r.product == id) {
            return error(StatusCode::NOT_FOUND, "Review not found");
        }
        reviews.remove(&review_id);
    }
    refresh_rating(&state, &id);
    Json(json!({ "message": "Review deleted successfully" })).into_response()
}
