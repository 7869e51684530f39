//! Environment Configuration

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use labpay_core::FeePolicy;

/// Everything the server reads from the environment, resolved once at boot.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Absolute base the redirect paths and onboarding links resolve against
    pub public_base_url: String,

    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    /// Processor base-URL override (for testing)
    pub stripe_api_url: Option<String>,

    pub content_store_token: String,
    /// Content-store base-URL override (for testing)
    pub content_store_url: Option<String>,
    pub listings_collection_id: String,
    pub payees_collection_id: String,

    pub fee: FeePolicy,

    pub automation_webhook_url: String,
    pub automation_webhook_secret: Option<String>,

    /// Attach error detail to API error bodies
    pub debug_error_detail: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            public_base_url: required("PUBLIC_BASE_URL")?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_url: optional("STRIPE_API_URL"),
            content_store_token: required("CONTENT_STORE_TOKEN")?,
            content_store_url: optional("CONTENT_STORE_URL"),
            listings_collection_id: required("LISTINGS_COLLECTION_ID")?,
            payees_collection_id: required("PAYEES_COLLECTION_ID")?,
            fee: fee_policy()?,
            automation_webhook_url: required("AUTOMATION_WEBHOOK_URL")?,
            automation_webhook_secret: optional("AUTOMATION_WEBHOOK_SECRET"),
            debug_error_detail: flag("DEBUG_ERROR_DETAIL"),
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} is not set"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag(name: &str) -> bool {
    optional(name).is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// A fixed fee amount wins over the percentage; with neither set, the default
/// rate applies.
fn fee_policy() -> Result<FeePolicy> {
    if let Some(cents) = optional("MARKETPLACE_FEE_CENTS") {
        let cents: i64 = cents
            .parse()
            .context("MARKETPLACE_FEE_CENTS must be an integer amount in cents")?;
        return Ok(FeePolicy::fixed(cents));
    }
    if let Some(percent) = optional("MARKETPLACE_FEE_PERCENT") {
        let percent: Decimal = percent
            .parse()
            .context("MARKETPLACE_FEE_PERCENT must be a decimal fraction, e.g. 0.18")?;
        return Ok(FeePolicy::percentage(percent));
    }
    Ok(FeePolicy::default())
}
