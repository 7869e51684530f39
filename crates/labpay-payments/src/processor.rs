//! Payment Processor Client
//!
//! Typed client for the Stripe v1 API over plain HTTP: form-encoded requests,
//! basic auth with the secret key, minimal response models covering only the
//! fields this pipeline reads. The base URL is configurable so tests can run
//! against a mock server.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{PaymentError, Result};

/// Base URL for the Stripe API.
const DEFAULT_API_URL: &str = "https://api.stripe.com";

/// Processor connection settings.
#[derive(Clone, Debug)]
pub struct StripeConfig {
    /// Secret API key
    pub secret_key: String,
    /// Base URL override (for testing)
    pub api_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Inputs for creating a hosted checkout session.
///
/// Exactly one of `price_id` and `unit_amount_cents` is expected; the
/// orchestrator decides which before calling.
#[derive(Clone, Debug)]
pub struct SessionParams {
    pub price_id: Option<String>,
    pub unit_amount_cents: Option<i64>,
    pub currency: String,
    pub product_name: String,
    pub customer_email: Option<String>,
    pub destination_account: String,
    pub application_fee_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

/// Checkout session, as much of it as the pipeline reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Present only when the session was retrieved with line items expanded
    #[serde(default)]
    pub line_items: Option<LineItemList>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItemList {
    #[serde(default)]
    pub data: Vec<LineItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Connected account status, for onboarding and status polling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccountLink {
    pub url: String,
}

/// Stripe API client
pub struct StripeClient {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Create a hosted checkout session. The destination account and
    /// application fee ride at the payment-intent level so the funds split
    /// at settlement.
    pub async fn create_checkout_session(&self, params: &SessionParams) -> Result<CheckoutSession> {
        tracing::info!(
            destination = %params.destination_account,
            fee_cents = params.application_fee_cents,
            "creating checkout session"
        );
        self.post_form("/v1/checkout/sessions", &session_form(params))
            .await
    }

    /// Retrieve a session with its line items expanded.
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.get_json(
            &format!("/v1/checkout/sessions/{session_id}"),
            &[("expand[]", "line_items")],
        )
        .await
    }

    pub async fn retrieve_price(&self, price_id: &str) -> Result<Price> {
        self.get_json(&format!("/v1/prices/{price_id}"), &[]).await
    }

    /// Create an express connected account for a new payee.
    pub async fn create_account(&self, email: Option<&str>) -> Result<Account> {
        let mut form = vec![("type".to_string(), "express".to_string())];
        if let Some(email) = email {
            form.push(("email".to_string(), email.to_string()));
        }
        self.post_form("/v1/accounts", &form).await
    }

    pub async fn retrieve_account(&self, account_id: &str) -> Result<Account> {
        self.get_json(&format!("/v1/accounts/{account_id}"), &[])
            .await
    }

    /// Hosted onboarding link for a connected account.
    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink> {
        let form = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        self.post_form("/v1/account_links", &form).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.config.api_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentError::ProcessorUnavailable(e.to_string()))?;
        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{path}", self.config.api_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .query(query)
            .send()
            .await
            .map_err(|e| PaymentError::ProcessorUnavailable(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| PaymentError::Processor {
                status: status.as_u16(),
                message: format!("response decode error: {e}"),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        if status.is_server_error() {
            return Err(PaymentError::ProcessorUnavailable(format!(
                "status {}: {message}",
                status.as_u16()
            )));
        }
        Err(PaymentError::Processor {
            status: status.as_u16(),
            message,
        })
    }
}

/// Flatten session parameters into Stripe's bracketed form encoding.
fn session_form(params: &SessionParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), params.success_url.clone()),
        ("cancel_url".to_string(), params.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];

    if let Some(price_id) = &params.price_id {
        form.push(("line_items[0][price]".to_string(), price_id.clone()));
    } else if let Some(amount) = params.unit_amount_cents {
        form.push((
            "line_items[0][price_data][currency]".to_string(),
            params.currency.clone(),
        ));
        form.push((
            "line_items[0][price_data][unit_amount]".to_string(),
            amount.to_string(),
        ));
        form.push((
            "line_items[0][price_data][product_data][name]".to_string(),
            params.product_name.clone(),
        ));
    }

    if let Some(email) = &params.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    form.push((
        "payment_intent_data[application_fee_amount]".to_string(),
        params.application_fee_cents.to_string(),
    ));
    form.push((
        "payment_intent_data[transfer_data][destination]".to_string(),
        params.destination_account.clone(),
    ));

    for (key, value) in &params.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

/// Pull the human-readable message out of Stripe's error envelope, falling
/// back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
