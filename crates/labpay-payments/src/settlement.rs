//! Settlement Event Forwarding
//!
//! Receives signed processor webhook deliveries, filters for completed
//! checkout sessions, re-fetches the session from the processor and forwards
//! a trimmed payload to the automation endpoint. The processor retries
//! deliveries that do not get a success response, so the contract here is
//! strict: any failure after signature verification must surface as an error
//! so the caller can signal "retry me", and the event ledger keeps a
//! redelivery from reaching automation twice.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use labpay_core::{ReservationToken, SeatReservations};

use crate::automation::AutomationClient;
use crate::error::{PaymentError, Result};
use crate::ledger::EventLedger;
use crate::processor::{CheckoutSession, StripeClient};
use crate::signature::WebhookVerifier;

/// The event type that triggers forwarding. Everything else is acknowledged
/// and dropped.
pub const SETTLED_EVENT_TYPE: &str = "checkout.session.completed";

/// Incoming webhook envelope. The embedded object is kept raw; only the
/// session id is read from it, the rest comes from the re-fetch.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
struct WebhookEventData {
    object: Value,
}

/// How a verified delivery was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Not a settlement event; acknowledged without side effects.
    Ignored { event_type: String },
    /// Forwarded to automation and recorded in the ledger.
    Forwarded { event_id: String },
    /// Redelivery of an event the ledger already holds.
    AlreadyForwarded { event_id: String },
}

/// Webhook intake and forwarding pipeline.
pub struct SettlementForwarder {
    verifier: WebhookVerifier,
    processor: Arc<StripeClient>,
    automation: Arc<AutomationClient>,
    ledger: Arc<dyn EventLedger>,
    reservations: Arc<dyn SeatReservations>,
}

impl SettlementForwarder {
    pub fn new(
        verifier: WebhookVerifier,
        processor: Arc<StripeClient>,
        automation: Arc<AutomationClient>,
        ledger: Arc<dyn EventLedger>,
        reservations: Arc<dyn SeatReservations>,
    ) -> Self {
        Self {
            verifier,
            processor,
            automation,
            ledger,
            reservations,
        }
    }

    /// Handle one raw webhook delivery.
    ///
    /// The payload must be the exact bytes the processor sent; the signature
    /// covers them. Returns an error for signature failures and for any
    /// failure between verification and a recorded forward, so the caller
    /// can ask the processor to redeliver.
    pub async fn process_delivery(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<SettlementOutcome> {
        self.verifier.verify(payload, signature_header)?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| PaymentError::Validation(format!("webhook payload parse error: {e}")))?;

        if event.event_type != SETTLED_EVENT_TYPE {
            tracing::debug!(event_type = %event.event_type, "ignoring webhook event");
            return Ok(SettlementOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        if self.ledger.is_processed(&event.id).await {
            tracing::info!(event_id = %event.id, "duplicate settlement delivery");
            return Ok(SettlementOutcome::AlreadyForwarded { event_id: event.id });
        }

        let session_id = event.data.object["id"].as_str().ok_or_else(|| {
            PaymentError::Validation("completed event carries no session id".to_string())
        })?;

        // The event snapshot omits expanded line items; the re-fetched
        // session is the source of truth for what was bought.
        let session = self.processor.retrieve_checkout_session(session_id).await?;

        let payload = settlement_payload(&event, &session);
        self.automation.forward(&payload).await?;
        self.ledger.mark_processed(&event.id).await;
        self.commit_reservation(&session).await;

        tracing::info!(
            event_id = %event.id,
            session_id = %session.id,
            "settlement forwarded to automation"
        );
        Ok(SettlementOutcome::Forwarded { event_id: event.id })
    }

    /// Turn the buyer's seat hold into a committed sale. Sessions created
    /// before the reservation metadata existed simply skip this.
    async fn commit_reservation(&self, session: &CheckoutSession) {
        let lab_id = session.metadata.get("lab_id");
        let reservation_id = session.metadata.get("reservation_id");
        if let (Some(lab_id), Some(reservation_id)) = (lab_id, reservation_id) {
            let token = ReservationToken::from_string(reservation_id.clone());
            self.reservations.commit(lab_id, &token).await;
        }
    }
}

/// The shape automation receives. Line items are flattened to the fields the
/// downstream recipes actually read.
fn settlement_payload(event: &WebhookEvent, session: &CheckoutSession) -> Value {
    let line_items: Vec<Value> = session
        .line_items
        .as_ref()
        .map(|list| {
            list.data
                .iter()
                .map(|item| {
                    json!({
                        "description": item.description,
                        "quantity": item.quantity,
                        "amount_total": item.amount_total,
                        "currency": item.currency,
                        "price": item.price.as_ref().map(|price| json!({
                            "id": price.id,
                            "unit_amount": price.unit_amount,
                        })),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "event_id": event.id,
        "event_type": event.event_type,
        "created": event.created,
        "session": {
            "id": session.id,
            "customer_details": session.customer_details,
            "amount_total": session.amount_total,
            "currency": session.currency,
            "metadata": session.metadata,
            "line_items": line_items,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::AutomationConfig;
    use crate::ledger::MemoryEventLedger;
    use crate::processor::StripeConfig;
    use hmac::{Hmac, Mac};
    use labpay_core::MemorySeatLedger;
    use sha2::Sha256;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }

    fn forwarder(stripe: &MockServer, automation: &MockServer) -> SettlementForwarder {
        let mut stripe_config = StripeConfig::new("sk_test");
        stripe_config.api_url = stripe.uri();
        SettlementForwarder::new(
            WebhookVerifier::new(SECRET),
            Arc::new(StripeClient::new(stripe_config).unwrap()),
            Arc::new(
                AutomationClient::new(AutomationConfig::new(format!("{}/hooks", automation.uri())))
                    .unwrap(),
            ),
            Arc::new(MemoryEventLedger::with_default_retention()),
            Arc::new(MemorySeatLedger::with_defaults()),
        )
    }

    fn completed_event() -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1_700_000_000,
            "data": { "object": { "id": "cs_1" } }
        })
        .to_string()
    }

    async fn mount_session(stripe: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_1",
                "amount_total": 15000,
                "currency": "usd",
                "customer_details": { "email": "student@example.com", "name": "Sam" },
                "metadata": { "lab_id": "lab_1", "reservation_id": "res123" },
                "line_items": {
                    "data": [{
                        "description": "Rust Fundamentals",
                        "quantity": 1,
                        "amount_total": 15000,
                        "currency": "usd",
                        "price": { "id": "price_123", "unit_amount": 15000, "currency": "usd" }
                    }]
                }
            })))
            .mount(stripe)
            .await;
    }

    #[tokio::test]
    async fn test_completed_event_is_forwarded_once() {
        let stripe = MockServer::start().await;
        let automation = MockServer::start().await;
        mount_session(&stripe).await;
        Mock::given(method("POST"))
            .and(path("/hooks"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&automation)
            .await;

        let forwarder = forwarder(&stripe, &automation);
        let payload = completed_event();

        let outcome = forwarder
            .process_delivery(payload.as_bytes(), &sign(&payload))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::Forwarded {
                event_id: "evt_1".to_string()
            }
        );

        let requests = automation.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["event_id"], "evt_1");
        assert_eq!(body["session"]["id"], "cs_1");
        assert_eq!(body["session"]["amount_total"], 15000);
        assert_eq!(body["session"]["metadata"]["lab_id"], "lab_1");
        assert_eq!(
            body["session"]["line_items"][0]["price"]["unit_amount"],
            15000
        );

        // Redelivery is acknowledged without a second forward.
        let outcome = forwarder
            .process_delivery(payload.as_bytes(), &sign(&payload))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::AlreadyForwarded {
                event_id: "evt_1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_other_event_types_are_ignored() {
        let stripe = MockServer::start().await;
        let automation = MockServer::start().await;

        let payload = serde_json::json!({
            "id": "evt_2",
            "type": "payment_intent.created",
            "data": { "object": {} }
        })
        .to_string();

        let outcome = forwarder(&stripe, &automation)
            .process_delivery(payload.as_bytes(), &sign(&payload))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::Ignored {
                event_type: "payment_intent.created".to_string()
            }
        );
        assert!(stripe.received_requests().await.unwrap().is_empty());
        assert!(automation.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_automation_failure_leaves_event_retryable() {
        let stripe = MockServer::start().await;
        let automation = MockServer::start().await;
        mount_session(&stripe).await;
        Mock::given(method("POST"))
            .and(path("/hooks"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&automation)
            .await;
        Mock::given(method("POST"))
            .and(path("/hooks"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&automation)
            .await;

        let forwarder = forwarder(&stripe, &automation);
        let payload = completed_event();

        let err = forwarder
            .process_delivery(payload.as_bytes(), &sign(&payload))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Forward(_)));

        // The ledger must not hold the event, so the processor's redelivery
        // goes through once automation recovers.
        let outcome = forwarder
            .process_delivery(payload.as_bytes(), &sign(&payload))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SettlementOutcome::Forwarded {
                event_id: "evt_1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected_before_any_fetch() {
        let stripe = MockServer::start().await;
        let automation = MockServer::start().await;

        let payload = completed_event();
        let err = forwarder(&stripe, &automation)
            .process_delivery(payload.as_bytes(), "t=0,v1=deadbeef")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Signature(_)));
        assert!(stripe.received_requests().await.unwrap().is_empty());
        assert!(automation.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_event_without_session_id_is_invalid() {
        let stripe = MockServer::start().await;
        let automation = MockServer::start().await;

        let payload = serde_json::json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": { "customer": "cus_1" } }
        })
        .to_string();

        let err = forwarder(&stripe, &automation)
            .process_delivery(payload.as_bytes(), &sign(&payload))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }
}
