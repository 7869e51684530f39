//! # labpay-server
//!
//! Axum HTTP server exposing the checkout API, the processor webhook intake
//! and the connected-account onboarding glue.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{
    connect_onboard, connect_status, create_checkout, health_check, stripe_webhook,
};
use crate::state::AppState;

/// The full route table over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health & info
        .route("/health", get(health_check))
        // Checkout API
        .route("/api/checkout", post(create_checkout))
        // Payee onboarding
        .route("/api/connect/onboard", post(connect_onboard))
        .route("/api/connect/status/{account_id}", get(connect_status))
        // Processor webhooks
        .route("/webhook/stripe", post(stripe_webhook))
        .with_state(state)
}
