//! Catalog Resolver
//!
//! Resolves listings and payee records out of the content store through one
//! cached, retried fetch primitive. Lookup by id is a point fetch; lookup by
//! slug is a bounded linear scan over paginated pages, O(n) because the store
//! has no slug index. Callers must not assume O(1) for slug lookups.

use std::time::Duration;

use serde_json::{Map, Value};

use labpay_core::Listing;

use crate::cache::TtlCache;
use crate::client::{CatalogItem, ContentStoreClient};
use crate::error::{CatalogError, Result};
use crate::payee;

/// Page size for slug scans.
const SLUG_PAGE_SIZE: u32 = 100;

/// Upper bound on items examined per slug lookup.
const SLUG_SCAN_LIMIT: u32 = 1000;

/// How a caller identifies a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingKey {
    Id(String),
    Slug(String),
}

/// Cached resolver over the content store.
pub struct Catalog {
    client: ContentStoreClient,
    cache: TtlCache<CatalogItem>,
    listings_collection: String,
    payees_collection: String,
}

impl Catalog {
    /// A zero `cache_ttl` turns every lookup into a network fetch.
    pub fn new(
        client: ContentStoreClient,
        listings_collection: impl Into<String>,
        payees_collection: impl Into<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            client,
            cache: TtlCache::new(cache_ttl),
            listings_collection: listings_collection.into(),
            payees_collection: payees_collection.into(),
        }
    }

    /// Resolve a listing by id or slug.
    pub async fn listing(&self, key: &ListingKey) -> Result<Listing> {
        match key {
            ListingKey::Id(id) => self.listing_by_id(id).await,
            ListingKey::Slug(slug) => self.listing_by_slug(slug).await,
        }
    }

    pub async fn listing_by_id(&self, id: &str) -> Result<Listing> {
        let item = self.cached_item(&self.listings_collection, id).await?;
        Ok(listing_from_item(&item))
    }

    pub async fn listing_by_slug(&self, slug: &str) -> Result<Listing> {
        let slug_key = format!("{}:slug:{slug}", self.listings_collection);
        if let Some(item) = self.cache.get(&slug_key) {
            tracing::debug!(slug = %slug, "catalog cache hit");
            return Ok(listing_from_item(&item));
        }

        let mut offset = 0;
        while offset < SLUG_SCAN_LIMIT {
            let page = self
                .client
                .items(&self.listings_collection, offset, SLUG_PAGE_SIZE)
                .await?;
            let count = page.len() as u32;

            for item in page {
                if item.slug.as_deref() == Some(slug) {
                    self.cache.set(&slug_key, item.clone());
                    let id_key = format!("{}:{}", self.listings_collection, item.id);
                    self.cache.set(&id_key, item.clone());
                    return Ok(listing_from_item(&item));
                }
            }

            if count < SLUG_PAGE_SIZE {
                break;
            }
            offset += count;
        }

        Err(CatalogError::NotFound {
            collection: self.listings_collection.clone(),
            key: format!("slug {slug}"),
        })
    }

    /// Connected-account id for a payee reference, scanning the legacy field
    /// candidates. `Ok(None)` means the payee has no usable account.
    pub async fn payee_account(&self, payee_ref: &str) -> Result<Option<String>> {
        let item = self.cached_item(&self.payees_collection, payee_ref).await?;
        Ok(payee::first_account_id(&item.field_data))
    }

    /// Drop all cached entries so the next lookups re-fetch.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    async fn cached_item(&self, collection: &str, item_id: &str) -> Result<CatalogItem> {
        let cache_key = format!("{collection}:{item_id}");
        if let Some(item) = self.cache.get(&cache_key) {
            tracing::debug!(collection = %collection, item_id = %item_id, "catalog cache hit");
            return Ok(item);
        }
        let item = self.client.item(collection, item_id).await?;
        self.cache.set(&cache_key, item.clone());
        Ok(item)
    }
}

/// Project a raw item into the Listing model. Parsing is total; whether the
/// listing is actually sellable is checked at checkout.
fn listing_from_item(item: &CatalogItem) -> Listing {
    let fields = &item.field_data;
    Listing {
        id: item.id.clone(),
        title: string_field(fields, "name").unwrap_or_else(|| item.id.clone()),
        slug: item.slug.clone(),
        price_id: string_field(fields, "price-id"),
        price_cents: int_field(fields, "price-cents"),
        seats_remaining: int_field(fields, "seats-remaining"),
        payee_ref: string_field(fields, "payee"),
        success_path: string_field(fields, "success-path"),
        cancel_path: string_field(fields, "cancel-path"),
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numeric field tolerant of the store returning numbers as strings.
fn int_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    match fields.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
