//! Checkout Orchestration
//!
//! Builds a hosted payment session for one lab purchase: resolve the listing,
//! gate on availability, hold a seat, resolve the payee's connected account,
//! settle on a unit amount, compute the marketplace fee, normalize redirect
//! URLs and create the processor session. Steps run strictly in order and
//! each is a hard failure point; the only cleanup on failure is releasing
//! the seat hold, since no processor session exists until the final step
//! succeeds.

use std::sync::Arc;

use labpay_catalog::{Catalog, CatalogError, ListingKey};
use labpay_core::{FeePolicy, Listing, ReservationToken, SeatReservations};

use crate::error::{PaymentError, Result};
use crate::processor::{SessionParams, StripeClient};
use crate::urls;

/// Orchestrator settings.
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Absolute base every relative redirect path resolves against
    pub public_base_url: String,
    /// Success path for listings that configure none
    pub default_success_path: String,
    /// Cancel path for listings that configure none
    pub default_cancel_path: String,
    /// Currency for inline-priced line items
    pub currency: String,
    pub fee: FeePolicy,
}

impl CheckoutConfig {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            default_success_path: "/thank-you".to_string(),
            default_cancel_path: "/".to_string(),
            currency: "usd".to_string(),
            fee: FeePolicy::default(),
        }
    }
}

/// One checkout attempt as received from the client.
#[derive(Clone, Debug, Default)]
pub struct CheckoutRequest {
    pub lab_id: Option<String>,
    pub lab_slug: Option<String>,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
}

/// What the caller gets back: the processor-hosted redirect URL and nothing
/// else.
#[derive(Clone, Debug)]
pub struct CheckoutCreated {
    pub url: String,
}

/// Checkout orchestrator
pub struct CheckoutService {
    catalog: Arc<Catalog>,
    processor: Arc<StripeClient>,
    reservations: Arc<dyn SeatReservations>,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<Catalog>,
        processor: Arc<StripeClient>,
        reservations: Arc<dyn SeatReservations>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            catalog,
            processor,
            reservations,
            config,
        }
    }

    /// Create a checkout session and return its redirect URL.
    pub async fn create(&self, request: CheckoutRequest) -> Result<CheckoutCreated> {
        let key = match (
            request.lab_id.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            request.lab_slug.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        ) {
            (Some(id), _) => ListingKey::Id(id.to_string()),
            (None, Some(slug)) => ListingKey::Slug(slug.to_string()),
            (None, None) => {
                return Err(PaymentError::Validation(
                    "a lab id or slug is required".to_string(),
                ));
            }
        };

        if let Some(email) = request.student_email.as_deref() {
            if !is_plausible_email(email) {
                return Err(PaymentError::Validation(format!(
                    "invalid email address: {email}"
                )));
            }
        }

        let listing = match self.catalog.listing(&key).await {
            Ok(listing) => listing,
            Err(CatalogError::NotFound { .. }) => {
                return Err(PaymentError::NotFound(describe_key(&key)));
            }
            Err(e) => return Err(e.into()),
        };

        if !listing.is_available() {
            return Err(PaymentError::SoldOut(listing.id.clone()));
        }
        // The hold closes the gap between this check and settlement. It is
        // released on any later failure and committed by the settlement path.
        let token = self
            .reservations
            .reserve(&listing.id, listing.seats_remaining)
            .await
            .ok_or_else(|| PaymentError::SoldOut(listing.id.clone()))?;

        match self.build_session(&listing, &token, &request).await {
            Ok(created) => Ok(created),
            Err(e) => {
                self.reservations.release(&listing.id, &token).await;
                Err(e)
            }
        }
    }

    async fn build_session(
        &self,
        listing: &Listing,
        token: &ReservationToken,
        request: &CheckoutRequest,
    ) -> Result<CheckoutCreated> {
        let payee_ref = listing.payee_ref.as_deref().ok_or_else(|| {
            PaymentError::Validation(format!("lab {} has no payee configured", listing.id))
        })?;
        let destination = self
            .catalog
            .payee_account(payee_ref)
            .await?
            .ok_or_else(|| {
                PaymentError::Validation(format!(
                    "payee {payee_ref} has no usable connected account id"
                ))
            })?;

        let (price_id, inline_amount, unit_amount) = self.resolve_pricing(listing).await?;

        // The fee never exceeds the amount it is charged against.
        let fee = self.config.fee.fee_for(unit_amount).min(unit_amount);

        let success_path = listing
            .success_path
            .as_deref()
            .unwrap_or(&self.config.default_success_path);
        let cancel_path = listing
            .cancel_path
            .as_deref()
            .unwrap_or(&self.config.default_cancel_path);

        let mut success = urls::resolve_redirect(&self.config.public_base_url, success_path)?;
        success.query_pairs_mut().append_pair("lab_id", &listing.id);
        let success_url = urls::ensure_session_token(success.as_str());
        let cancel_url = urls::resolve_redirect(&self.config.public_base_url, cancel_path)?
            .to_string();

        let mut metadata = vec![
            ("lab_id".to_string(), listing.id.clone()),
            ("destination_account".to_string(), destination.clone()),
            ("reservation_id".to_string(), token.to_string()),
        ];
        if let Some(name) = &request.student_name {
            metadata.push(("student_name".to_string(), name.clone()));
        }

        let params = SessionParams {
            price_id,
            unit_amount_cents: inline_amount,
            currency: self.config.currency.clone(),
            product_name: listing.title.clone(),
            customer_email: request.student_email.clone(),
            destination_account: destination,
            application_fee_cents: fee,
            success_url,
            cancel_url,
            metadata,
        };

        let session = self.processor.create_checkout_session(&params).await?;
        let url = session.url.ok_or_else(|| PaymentError::Processor {
            status: 200,
            message: "session created without a redirect URL".to_string(),
        })?;

        tracing::info!(
            lab_id = %listing.id,
            session_id = %session.id,
            fee_cents = fee,
            "checkout session created"
        );
        Ok(CheckoutCreated { url })
    }

    /// Settle the line item and the amount the fee is computed from. A price
    /// reference wins over any cached numeric amount, and its processor-held
    /// amount is the truth the fee uses; inline amounts are taken as given.
    async fn resolve_pricing(
        &self,
        listing: &Listing,
    ) -> Result<(Option<String>, Option<i64>, i64)> {
        if let Some(price_id) = &listing.price_id {
            let price = match self.processor.retrieve_price(price_id).await {
                Ok(price) => price,
                Err(PaymentError::Processor { status: 404, .. }) => {
                    return Err(PaymentError::Validation(format!(
                        "price {price_id} does not exist at the processor"
                    )));
                }
                Err(e) => return Err(e),
            };
            let unit_amount = price
                .unit_amount
                .filter(|amount| *amount > 0)
                .ok_or_else(|| {
                    PaymentError::Validation(format!(
                        "price {price_id} has no resolvable unit amount"
                    ))
                })?;
            return Ok((Some(price_id.clone()), None, unit_amount));
        }

        match listing.price_cents {
            Some(amount) if amount > 0 => Ok((None, Some(amount), amount)),
            Some(_) => Err(PaymentError::Validation(format!(
                "lab {} has a non-positive price",
                listing.id
            ))),
            None => Err(PaymentError::Validation(format!(
                "lab {} has no price configured",
                listing.id
            ))),
        }
    }
}

fn describe_key(key: &ListingKey) -> String {
    match key {
        ListingKey::Id(id) => format!("lab \"{id}\""),
        ListingKey::Slug(slug) => format!("lab \"{slug}\""),
    }
}

/// Just enough shape checking to catch obvious typos; the processor performs
/// the real validation at payment time.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
