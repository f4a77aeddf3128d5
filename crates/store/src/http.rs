//! Object storage over HTTP (Supabase Storage REST API)

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::geometry::GeometryStore;
use coastwalk_core::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// API key header for Supabase
const APIKEY_HEADER: &str = "apikey";

/// Makes an upload replace an existing object
const X_UPSERT: &str = "x-upsert";

/// Geometry store backed by a storage bucket
///
/// Adds to `reqwest`:
/// - retry with exponential backoff for transient failures
/// - a circuit breaker shared by all clones
/// - a request id per logical call
#[derive(Clone)]
pub struct HttpGeometryStore {
    inner: Client,
    config: Arc<StoreConfig>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl std::fmt::Debug for HttpGeometryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGeometryStore")
            .field("storage_url", &self.config.storage_url)
            .field("bucket", &self.config.bucket)
            .field("circuit", &self.circuit_breaker.state())
            .finish()
    }
}

impl HttpGeometryStore {
    /// Create a store from environment variables
    pub fn from_env() -> StoreResult<Self> {
        Self::with_config(StoreConfig::from_env())
    }

    /// Create a store with specific configuration
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("coastwalk-store/", env!("CARGO_PKG_VERSION"))),
        );

        if let Some(ref key) = config.service_role_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                default_headers.insert(APIKEY_HEADER, value);
            }
        }

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            inner,
            config: Arc::new(config),
            circuit_breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// `{storage_url}/object/{bucket}/{path}`
    pub fn object_url(&self, path: &str) -> StoreResult<String> {
        Ok(format!(
            "{}/object/{}/{}",
            self.config.require_storage_url()?,
            self.config.bucket,
            path.trim_start_matches('/')
        ))
    }

    async fn execute(&self, method: Method, url: &str, body: Option<&[u8]>) -> StoreResult<Vec<u8>> {
        let request_id = Uuid::new_v4().to_string();

        if !self.circuit_breaker.can_execute() {
            warn!(
                request_id = %request_id,
                url = %url,
                "Circuit breaker is open, rejecting request"
            );
            return Err(StoreError::CircuitOpen);
        }

        self.execute_with_retry(&request_id, method, url, body).await
    }

    async fn execute_with_retry(
        &self,
        request_id: &str,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> StoreResult<Vec<u8>> {
        let retry_config = &self.config.retry;
        let mut last_error: Option<StoreError> = None;

        for attempt in 0..retry_config.max_attempts {
            if attempt > 0 {
                let delay = retry_config.delay_for_attempt(attempt);
                debug!(
                    request_id = %request_id,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let result = self.execute_single_request(request_id, method.clone(), url, body).await;
            let elapsed = start.elapsed();

            match result {
                Ok(bytes) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Request succeeded"
                    );
                    return Ok(bytes);
                }
                Err(e) => {
                    // A missing object is an answer, not an outage
                    if !matches!(e, StoreError::ApiResponse { status: 400 | 404, .. }) {
                        self.circuit_breaker.record_failure();
                    }

                    if e.is_retryable() && attempt + 1 < retry_config.max_attempts {
                        debug!(
                            request_id = %request_id,
                            attempt = attempt + 1,
                            error = %e,
                            "Request failed, will retry"
                        );
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(StoreError::RetriesExhausted {
            attempts: retry_config.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    async fn execute_single_request(
        &self,
        request_id: &str,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> StoreResult<Vec<u8>> {
        let mut request = self.inner.request(method, url).header(X_REQUEST_ID, request_id);

        if let Some(ref key) = self.config.service_role_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        if let Some(bytes) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .header(X_UPSERT, "true")
                .body(bytes.to_vec());
        }

        let response = request.send().await?;
        handle_response(response).await
    }
}

async fn handle_response(response: Response) -> StoreResult<Vec<u8>> {
    let status = response.status();

    if status.is_success() {
        Ok(response.bytes().await?.to_vec())
    } else {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StoreError::api_response(status.as_u16(), message))
    }
}

impl GeometryStore for HttpGeometryStore {
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn put_document(&self, path: &str, body: Vec<u8>) -> StoreResult<()> {
        let url = self.object_url(path)?;
        self.execute(Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_document(&self, path: &str) -> StoreResult<Vec<u8>> {
        let url = self.object_url(path)?;
        self.execute(Method::GET, &url, None)
            .await
            .map_err(|e| StoreError::not_found(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coastwalk_core::retry::RetryConfig;
    use std::time::Duration;

    fn config(url: &str) -> StoreConfig {
        StoreConfig::default()
            .with_storage_url(url)
            .with_service_role_key("service-key")
            .with_retry(RetryConfig::no_retry())
            .with_timeout(Duration::from_secs(2))
    }

    #[test]
    fn test_store_creation() {
        let store = HttpGeometryStore::with_config(config("https://example.supabase.co/storage/v1"));
        assert!(store.is_ok());
    }

    #[test]
    fn test_store_requires_url() {
        let err = HttpGeometryStore::with_config(StoreConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotConfigured(_)));
    }

    #[test]
    fn test_object_url() {
        let store = HttpGeometryStore::with_config(config("https://example.supabase.co/storage/v1/")).unwrap();
        assert_eq!(
            store.object_url("JP-13/coastline_processed.geojson").unwrap(),
            "https://example.supabase.co/storage/v1/object/map-data/JP-13/coastline_processed.geojson"
        );
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_not_found() {
        // Nothing listens on port 9 locally
        let store = HttpGeometryStore::with_config(config("http://127.0.0.1:9")).unwrap();
        let err = store.fetch_coastline("JP-13").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.is_unavailable());
    }
}
