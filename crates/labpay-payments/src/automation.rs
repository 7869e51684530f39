//! Automation Forwarding Client
//!
//! Delivers normalized settlement payloads to the downstream automation
//! endpoint. One attempt per delivery: the processor's own webhook retry is
//! the safety net, so a failure here must surface to the webhook handler
//! rather than being retried and possibly double-delivered locally.

use serde_json::Value;
use std::time::Duration;

use crate::error::{PaymentError, Result};

/// Shared-secret header carried on every forward.
pub const SECRET_HEADER: &str = "x-automation-secret";

/// Automation endpoint settings.
#[derive(Clone, Debug)]
pub struct AutomationConfig {
    pub endpoint: String,
    /// Shared secret, omitted from requests when not configured
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl AutomationConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outbound client for the automation endpoint.
pub struct AutomationClient {
    http: reqwest::Client,
    config: AutomationConfig,
}

impl AutomationClient {
    pub fn new(config: AutomationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Forward a payload. Any non-2xx response or transport failure is a
    /// forward failure; only a confirmed 2xx counts as delivered.
    pub async fn forward(&self, payload: &Value) -> Result<()> {
        let mut request = self.http.post(&self.config.endpoint).json(payload);
        if let Some(secret) = &self.config.secret {
            request = request.header(SECRET_HEADER, secret);
        }

        let response = request.send().await.map_err(|e| {
            PaymentError::Forward(format!("automation endpoint unreachable: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PaymentError::Forward(format!(
                "automation endpoint returned status {}",
                status.as_u16()
            )));
        }

        tracing::info!(status = status.as_u16(), "payload forwarded to automation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_forward_sends_secret_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks/settlement"))
            .and(header(SECRET_HEADER, "shh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = AutomationConfig::new(format!("{}/hooks/settlement", server.uri()));
        config.secret = Some("shh".to_string());
        let client = AutomationClient::new(config).unwrap();

        client.forward(&json!({ "event_id": "evt_1" })).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_forward_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = AutomationClient::new(AutomationConfig::new(server.uri())).unwrap();
        let err = client.forward(&json!({})).await.unwrap_err();

        assert!(matches!(err, PaymentError::Forward(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_forward_failure() {
        // Discard port; nothing listens there.
        let client =
            AutomationClient::new(AutomationConfig::new("http://127.0.0.1:9/hooks")).unwrap();
        let err = client.forward(&json!({})).await.unwrap_err();

        assert!(matches!(err, PaymentError::Forward(_)));
    }
}
