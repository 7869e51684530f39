//! # labpay-payments
//!
//! Payment-side pipeline for the lab marketplace: the Stripe client, the
//! checkout orchestrator, webhook signature verification and the settlement
//! forwarder that hands completed purchases to the automation endpoint.

pub mod automation;
pub mod checkout;
pub mod error;
pub mod ledger;
pub mod processor;
pub mod settlement;
pub mod signature;
pub mod urls;

pub use automation::{AutomationClient, AutomationConfig};
pub use checkout::{CheckoutConfig, CheckoutCreated, CheckoutRequest, CheckoutService};
pub use error::{PaymentError, Result};
pub use ledger::{EventLedger, MemoryEventLedger};
pub use processor::{
    Account, AccountLink, CheckoutSession, Price, SessionParams, StripeClient, StripeConfig,
};
pub use settlement::{SettlementForwarder, SettlementOutcome};
pub use signature::WebhookVerifier;
