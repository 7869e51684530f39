//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use labpay_payments::{CheckoutRequest, PaymentError};

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub automation_secret_set: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    #[serde(default)]
    pub lab_id: Option<String>,
    #[serde(default)]
    pub lab_slug: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub student_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectOnboardBody {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOnboardResponse {
    pub account_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectStatusResponse {
    pub account_id: String,
    pub charges_enabled: bool,
    pub details_submitted: bool,
    pub payouts_enabled: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        automation_secret_set: state.automation_secret_set,
    })
}

/// Create a checkout session for one lab purchase
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let request = CheckoutRequest {
        lab_id: body.lab_id,
        lab_slug: body.lab_slug,
        student_name: body.student_name,
        student_email: body.student_email,
    };

    let created = state.checkout.create(request).await.map_err(|e| {
        tracing::warn!(error = %e, "checkout failed");
        ApiError::from_payment(e, state.debug_error_detail)
    })?;

    Ok(Json(CheckoutResponse { url: created.url }))
}

/// Processor webhook intake.
///
/// The response status is the retry signal: 2xx acknowledges the delivery and
/// stops redelivery, anything else asks the processor to send it again. A
/// forward failure therefore answers 500 even though the delivery itself was
/// received and verified.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing stripe-signature header" })),
        )
            .into_response();
    };

    match state.settlement.process_delivery(&body, signature).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "webhook delivery handled");
            (StatusCode::OK, Json(json!({ "received": true }))).into_response()
        }
        Err(err @ PaymentError::Signature(_)) => {
            tracing::warn!(error = %err, "webhook signature rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.user_message() })),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "settlement processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "received": true,
                    "forwarded": false,
                    "error": err.user_message(),
                })),
            )
                .into_response()
        }
    }
}

/// Create a connected account and its hosted onboarding link
pub async fn connect_onboard(
    State(state): State<AppState>,
    Json(body): Json<ConnectOnboardBody>,
) -> Result<Json<ConnectOnboardResponse>, ApiError> {
    let account = state
        .processor
        .create_account(body.email.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "connected account creation failed");
            ApiError::from_payment(e, state.debug_error_detail)
        })?;

    let refresh_url = format!("{}/connect/refresh", state.public_base_url);
    let return_url = format!("{}/connect/complete", state.public_base_url);
    let link = state
        .processor
        .create_account_link(&account.id, &refresh_url, &return_url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "onboarding link creation failed");
            ApiError::from_payment(e, state.debug_error_detail)
        })?;

    tracing::info!(account_id = %account.id, "connect onboarding link created");
    Ok(Json(ConnectOnboardResponse {
        account_id: account.id,
        url: link.url,
    }))
}

/// Report a connected account's onboarding state
pub async fn connect_status(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<ConnectStatusResponse>, ApiError> {
    let account = match state.processor.retrieve_account(&account_id).await {
        Ok(account) => account,
        Err(PaymentError::Processor { status: 404, .. }) => {
            return Err(ApiError::not_found(format!("account {account_id} not found")));
        }
        Err(e) => {
            tracing::error!(error = %e, "account status lookup failed");
            return Err(ApiError::from_payment(e, state.debug_error_detail));
        }
    };

    Ok(Json(ConnectStatusResponse {
        account_id: account.id,
        charges_enabled: account.charges_enabled,
        details_submitted: account.details_submitted,
        payouts_enabled: account.payouts_enabled,
    }))
}
