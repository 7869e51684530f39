//! # labpay-catalog
//!
//! Content-store access for the labpay marketplace:
//! - HTTP client for the headless content store (bearer auth, retry with backoff)
//! - TTL cache with an explicit get/set/clear interface
//! - Catalog resolver: listings by id or slug, payee records
//! - Payee resolver: connected-account id lookup across legacy field names

pub mod cache;
pub mod client;
pub mod error;
pub mod payee;
pub mod resolver;

pub use cache::TtlCache;
pub use client::{CatalogItem, ContentStoreClient, ContentStoreConfig};
pub use error::{CatalogError, Result};
pub use payee::{ACCOUNT_FIELD_CANDIDATES, first_account_id};
pub use resolver::{Catalog, ListingKey};
