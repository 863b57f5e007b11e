//! Catalog endpoints: product listing, product detail, categories.

use async_trait::async_trait;
use hearthwood_core::{CategoryId, Price, ProductId, format_rating, stars};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ApiClient, ApiError, ProductCatalog};

/// Page size used when a query does not set one.
const DEFAULT_PAGE_SIZE: u32 = 12;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, alias = "avg_rating")]
    pub average_rating: Option<Decimal>,
    #[serde(default, alias = "total_reviews", deserialize_with = "lenient_count")]
    pub review_count: Option<u32>,
}

/// Review counts come from a SQL `COUNT`, which some drivers send as a string.
fn lenient_count<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl Product {
    /// Average rating and count, e.g. `★★★★½ 4.5 (2 reviews)`, or `None`
    /// before the first review.
    #[must_use]
    pub fn rating_summary(&self) -> Option<String> {
        let count = self.review_count.filter(|&c| c > 0)?;
        let average = self.average_rating.unwrap_or(Decimal::ZERO);
        Some(format!("{} {}", stars(average), format_rating(average, count)))
    }

    /// The main image: `image_url` if set, otherwise the first gallery image.
    #[must_use]
    pub fn primary_image_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or_else(|| self.images.first().map(|i| i.image_url.as_str()))
    }

    /// True if the catalog reports no units left.
    #[must_use]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity.is_some_and(|s| s <= 0)
    }
}

/// One gallery image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub image_url: String,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Filters for `GET /products`. Unset fields are left out of the query
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Query-string pairs in a stable order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(id) = self.category_id {
            pairs.push(("category_id", id.to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// One page of products with pagination totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    /// Matching products across all pages.
    pub total: u64,
    pub total_pages: u64,
}

/// Listing response. Some backend versions use `data` instead of `products`
/// and omit the totals.
#[derive(Debug, Deserialize)]
struct ProductListResponse {
    #[serde(alias = "data", default)]
    products: Vec<Product>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    total_pages: Option<u64>,
}

impl ProductListResponse {
    fn into_page(self, query: &ProductQuery) -> ProductPage {
        let limit = u64::from(query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1));
        let total = self.total.unwrap_or(self.products.len() as u64);
        let total_pages = self.total_pages.unwrap_or_else(|| total.div_ceil(limit));
        ProductPage {
            products: self.products,
            page: query.page.unwrap_or(1),
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    product: Product,
}

#[derive(Debug, Deserialize)]
struct CategoriesEnvelope {
    #[serde(default)]
    categories: Vec<Category>,
}

impl ApiClient {
    /// List products matching `query` (`GET /products`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let mut url = self.endpoint("products")?;
        let pairs = query.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        let response: ProductListResponse = self.get_json(url).await?;
        let page = response.into_page(query);
        debug!(count = page.products.len(), total = page.total, "Listed products");
        Ok(page)
    }

    /// Fetch one product (`GET /products/{id}`), served from cache when
    /// fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = id.as_path_segment();
        if let Some(product) = self.product_cache().get(&cache_key).await {
            debug!("Product cache hit");
            return Ok(product);
        }

        self.fetch_product(id).await
    }

    /// Fetch one product from the backend, bypassing the cache, and refresh
    /// the cached copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    pub async fn fetch_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = id.as_path_segment();
        let url = self.endpoint_segments(&["products", &cache_key])?;
        let envelope: ProductEnvelope = self.get_json(url).await?;
        self.product_cache()
            .insert(cache_key, envelope.product.clone())
            .await;
        Ok(envelope.product)
    }

    /// Drop a product from the cache so the next lookup hits the backend.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.product_cache().invalidate(&id.as_path_segment()).await;
    }

    /// List all categories (`GET /categories`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint("categories")?;
        let envelope: CategoriesEnvelope = self.get_json(url).await?;
        Ok(envelope.categories)
    }
}

#[async_trait]
impl ProductCatalog for ApiClient {
    async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.get_product(id).await
    }
}

/// Catalog that always asks the backend. Used where a cached price would
/// defeat the purpose, such as re-validating a checkout snapshot.
#[derive(Debug, Clone)]
pub struct LiveCatalog(pub ApiClient);

#[async_trait]
impl ProductCatalog for LiveCatalog {
    async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.0.fetch_product(id).await
    }
}
