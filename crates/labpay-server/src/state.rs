//! Application State

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use labpay_catalog::{Catalog, ContentStoreClient, ContentStoreConfig};
use labpay_core::{MemorySeatLedger, SeatReservations};
use labpay_payments::{
    AutomationClient, AutomationConfig, CheckoutConfig, CheckoutService, MemoryEventLedger,
    SettlementForwarder, StripeClient, StripeConfig, WebhookVerifier,
};

use crate::config::AppConfig;

/// How long resolved catalog items stay fresh.
const CATALOG_CACHE_TTL: Duration = Duration::from_secs(300);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout orchestrator
    pub checkout: Arc<CheckoutService>,

    /// Webhook intake and automation forwarding
    pub settlement: Arc<SettlementForwarder>,

    /// Direct processor access for connect onboarding
    pub processor: Arc<StripeClient>,

    /// Base for onboarding redirect URLs (no trailing slash)
    pub public_base_url: String,

    /// Attach error detail to API error bodies
    pub debug_error_detail: bool,

    /// Whether outbound automation calls carry the shared secret
    pub automation_secret_set: bool,
}

/// Wire every service to the resolved configuration. The seat ledger is
/// shared between checkout (reserve/release) and settlement (commit).
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let mut store_config = ContentStoreConfig::new(config.content_store_token.clone());
    if let Some(url) = &config.content_store_url {
        store_config.base_url = url.clone();
    }
    let catalog = Arc::new(Catalog::new(
        ContentStoreClient::new(store_config)?,
        config.listings_collection_id.clone(),
        config.payees_collection_id.clone(),
        CATALOG_CACHE_TTL,
    ));

    let mut stripe_config = StripeConfig::new(config.stripe_secret_key.clone());
    if let Some(url) = &config.stripe_api_url {
        stripe_config.api_url = url.clone();
    }
    let processor = Arc::new(StripeClient::new(stripe_config)?);

    let mut automation_config = AutomationConfig::new(config.automation_webhook_url.clone());
    automation_config.secret = config.automation_webhook_secret.clone();
    let automation = Arc::new(AutomationClient::new(automation_config)?);

    let reservations: Arc<dyn SeatReservations> = Arc::new(MemorySeatLedger::with_defaults());

    let mut checkout_config = CheckoutConfig::new(config.public_base_url.clone());
    checkout_config.fee = config.fee.clone();

    let checkout = Arc::new(CheckoutService::new(
        catalog,
        processor.clone(),
        reservations.clone(),
        checkout_config,
    ));

    let settlement = Arc::new(SettlementForwarder::new(
        WebhookVerifier::new(config.stripe_webhook_secret.clone()),
        processor.clone(),
        automation,
        Arc::new(MemoryEventLedger::with_default_retention()),
        reservations,
    ));

    Ok(AppState {
        checkout,
        settlement,
        processor,
        public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        debug_error_detail: config.debug_error_detail,
        automation_secret_set: config.automation_webhook_secret.is_some(),
    })
}
