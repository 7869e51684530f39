//! Content Store Client
//!
//! Thin HTTP client for the headless content store. Speaks the Webflow v2
//! data-API dialect (bearer auth, `fieldData` items, `{ "items": [...] }`
//! pages) but the base URL can point at anything serving the same shapes,
//! which is how the tests run against a mock server.
//!
//! Retry policy: network errors, 429 and 5xx retry with exponential backoff
//! up to the configured attempt count; 404 and other 4xx fail immediately.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{CatalogError, Result};

/// Base URL for the content store API.
const DEFAULT_BASE_URL: &str = "https://api.webflow.com/v2";

/// Content-store connection settings.
#[derive(Clone, Debug)]
pub struct ContentStoreConfig {
    /// Bearer token for API authentication
    pub token: String,
    /// Base URL override (for testing)
    pub base_url: String,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Total attempts for retryable failures
    pub max_attempts: u32,
    /// First retry delay, doubling per attempt
    pub retry_base_delay: Duration,
}

impl ContentStoreConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
        }
    }
}

/// One item as the content store returns it: an opaque id, an optional slug
/// and an arbitrary keyed attribute map.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub field_data: serde_json::Map<String, Value>,
}

/// HTTP client with retry and response normalization.
pub struct ContentStoreClient {
    http: reqwest::Client,
    config: ContentStoreConfig,
}

impl ContentStoreClient {
    pub fn new(config: ContentStoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Point fetch of a single item by id.
    pub async fn item(&self, collection_id: &str, item_id: &str) -> Result<CatalogItem> {
        let path = format!("/collections/{collection_id}/items/{item_id}");
        match self.get_json(&path).await? {
            Some(value) => parse_item(value),
            None => Err(CatalogError::NotFound {
                collection: collection_id.to_string(),
                key: item_id.to_string(),
            }),
        }
    }

    /// One page of a collection listing.
    pub async fn items(
        &self,
        collection_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<CatalogItem>> {
        let path = format!("/collections/{collection_id}/items?limit={limit}&offset={offset}");
        match self.get_json(&path).await? {
            Some(value) => parse_page(value),
            // A 404 on the collection itself is a wrong collection id, not a
            // missing item.
            None => Err(CatalogError::Rejected {
                status: 404,
                body: format!("collection {collection_id} not found"),
            }),
        }
    }

    /// Authenticated GET with retry. `Ok(None)` signals a 404 so callers can
    /// attach their own collection/key context.
    async fn get_json(&self, path_and_query: &str) -> Result<Option<Value>> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path_and_query
        );
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 {
                let delay = self.config.retry_base_delay * 2u32.pow(attempt - 2);
                tokio::time::sleep(delay).await;
            }
            tracing::debug!(url = %url, attempt, "content store request");

            match self
                .http
                .get(&url)
                .bearer_auth(&self.config.token)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let value = response
                            .json::<Value>()
                            .await
                            .map_err(|e| CatalogError::Decode(e.to_string()))?;
                        return Ok(Some(value));
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_error = format!("status {}", status.as_u16());
                        tracing::warn!(
                            attempt,
                            status = status.as_u16(),
                            "content store returned retryable status"
                        );
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    return Err(CatalogError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(attempt, error = %e, "content store request failed");
                }
            }
        }

        Err(CatalogError::Unavailable {
            attempts: self.config.max_attempts,
            last_error,
        })
    }
}

/// Normalize the two item shapes the store serves: the bare item and the
/// `{ "item": ... }` wrapper. A missing top-level slug falls back to the
/// `slug` attribute inside the field map.
fn parse_item(value: Value) -> Result<CatalogItem> {
    let inner = match value {
        Value::Object(mut map) => match map.remove("item") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    };
    let mut item: CatalogItem =
        serde_json::from_value(inner).map_err(|e| CatalogError::Decode(e.to_string()))?;
    if item.slug.is_none() {
        item.slug = item
            .field_data
            .get("slug")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    Ok(item)
}

fn parse_page(value: Value) -> Result<Vec<CatalogItem>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CatalogError::Decode(
                    "list response carries no items array".to_string(),
                ));
            }
        },
        _ => {
            return Err(CatalogError::Decode(
                "list response is neither an array nor an object".to_string(),
            ));
        }
    };
    items.into_iter().map(parse_item).collect()
}
