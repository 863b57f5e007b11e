//! HTTP plumbing shared by every endpoint.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::{ApiError, Product};
use crate::config::StorefrontConfig;
use crate::error::add_breadcrumb;
use crate::session::AuthSession;

/// Request ID header, matching what the backend logs.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum number of cached product details.
const PRODUCT_CACHE_CAPACITY: u64 = 1000;

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the connection pool, cache and session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: AuthSession,
    products: Cache<String, Product>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `config.api_base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig, session: AuthSession) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.clone(),
                session,
                products,
            }),
        })
    }

    /// The session whose token this client sends.
    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    pub(super) fn product_cache(&self) -> &Cache<String, Product> {
        &self.inner.products
    }

    /// Resolve a relative path such as `products` against the base URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Append path segments to the base URL, percent-encoding each one.
    pub(super) fn endpoint_segments(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    pub(super) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let request = self.inner.http.get(url);
        let response = self.send(request).await?;
        decode(response).await
    }

    pub(super) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.inner.http.post(url).json(body);
        let response = self.send(request).await?;
        decode(response).await
    }

    /// POST and return the body as loose JSON. A 2xx response never fails to
    /// decode: an empty or non-JSON body reads as `null`.
    pub(super) async fn post_value<B>(&self, url: Url, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.inner.http.post(url).json(body);
        let response = self.send(request).await?;
        Ok(decode_lenient(response).await)
    }

    /// PUT counterpart of [`Self::post_value`].
    pub(super) async fn put_value<B>(&self, url: Url, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.inner.http.put(url).json(body);
        let response = self.send(request).await?;
        Ok(decode_lenient(response).await)
    }

    /// DELETE counterpart of [`Self::post_value`].
    pub(super) async fn delete_value(&self, url: Url) -> Result<Value, ApiError> {
        let request = self.inner.http.delete(url);
        let response = self.send(request).await?;
        Ok(decode_lenient(response).await)
    }

    /// Send a request with the request ID and bearer token attached, and turn
    /// every non-2xx status into an error.
    ///
    /// A 401 clears the stored session before returning
    /// [`ApiError::Unauthorized`].
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let mut request = request.header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = self.inner.session.token() {
            let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()));
            match bearer {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    request = request.header(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending without it"),
            }
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(%status, request_id = %request_id, url = %response.url(), "Backend responded");

        if status == StatusCode::UNAUTHORIZED {
            warn!(request_id = %request_id, "Backend returned 401, clearing session");
            if let Err(e) = self.inner.session.clear() {
                warn!(error = %e, "Failed to clear session after 401");
            }
            add_breadcrumb("auth", "Session expired", None);
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!(%status, request_id = %request_id, message = message.as_deref().unwrap_or(""), "Backend returned error");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Http(e)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn decode_lenient(response: reqwest::Response) -> Value {
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to read success response body");
            return Value::Null;
        }
    };
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(error = %e, "Success response body is not JSON");
        Value::Null
    })
}

/// Pull the human-readable message out of an error body.
///
/// The backend uses `{"error": "..."}` on most routes and
/// `{"message": "..."}` on a few. Anything else yields `None` so raw bodies
/// (HTML error pages, stack traces) are never shown.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client(base: &str) -> ApiClient {
        let config = StorefrontConfig::for_base_url(Url::parse(base).unwrap());
        let session = AuthSession::new(Arc::new(MemoryStore::new()));
        ApiClient::new(&config, session).unwrap()
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error": "Insufficient stock", "message": "ignored"}"#).as_deref(),
            Some("Insufficient stock")
        );
        assert_eq!(
            error_message(r#"{"message": "Username already exists"}"#).as_deref(),
            Some("Username already exists")
        );
    }

    #[test]
    fn test_error_message_ignores_non_json() {
        assert_eq!(error_message("<html>502 Bad Gateway</html>"), None);
        assert_eq!(error_message(r#"{"error": ""}"#), None);
        assert_eq!(error_message(r#"{"error": {"code": 3}}"#), None);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client("http://localhost:5000/api");
        assert_eq!(
            client.endpoint("products").unwrap().as_str(),
            "http://localhost:5000/api/products"
        );
        assert_eq!(
            client.endpoint_segments(&["orders", "7", "cancel"]).unwrap().as_str(),
            "http://localhost:5000/api/orders/7/cancel"
        );
    }

    #[test]
    fn test_endpoint_segments_encode_ids() {
        let client = client("http://localhost:5000/api/");
        assert_eq!(
            client.endpoint_segments(&["products", "oak chair/2"]).unwrap().as_str(),
            "http://localhost:5000/api/products/oak%20chair%2F2"
        );
    }
}
