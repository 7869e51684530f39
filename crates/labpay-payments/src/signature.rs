//! Webhook Signature Verification
//!
//! The processor signs each delivery with a header of comma-separated
//! `key=value` pairs: `t=<unix seconds>,v1=<hex hmac>`. The HMAC-SHA256 runs
//! over `"{t}." + raw body`, so verification needs the unparsed request body.
//! Several `v1` entries may appear while the signing secret is being rolled;
//! any one matching is enough.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Replay window: deliveries with a timestamp further than this from now are
/// rejected even if the signature itself is valid.
const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Verifies processor webhook deliveries against the shared signing secret.
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Verify a delivery. Error messages here are public-facing by contract;
    /// they disclose the verification failure, never internal state.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], signature_header: &str, now_unix: i64) -> Result<()> {
        let (timestamp, candidates) = parse_header(signature_header)?;

        let age = now_unix - timestamp;
        if age.unsigned_abs() > self.tolerance.as_secs() {
            return Err(PaymentError::Signature(format!(
                "timestamp outside tolerance ({age}s old)"
            )));
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| PaymentError::Signature("invalid signing secret".to_string()))?;
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);

        // Mac::verify_slice is the constant-time comparison.
        for candidate in &candidates {
            if let Ok(bytes) = hex::decode(candidate) {
                if mac.clone().verify_slice(&bytes).is_ok() {
                    return Ok(());
                }
            }
        }

        Err(PaymentError::Signature(
            "no matching v1 signature".to_string(),
        ))
    }
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for pair in header.split(',') {
        match pair.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::Signature("header carries no timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(PaymentError::Signature(
            "header carries no v1 signature".to_string(),
        ));
    }
    Ok((timestamp, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, SECRET, now());

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(payload, &header).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, "wrong_secret", now());

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(payload, &header).is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(payload, SECRET, now());
        let tampered = br#"{"type":"checkout.session.completed","hacked":true}"#;

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(tampered, &header).is_err());
    }

    #[test]
    fn test_old_timestamp_rejected() {
        let payload = b"{}";
        // 10 minutes ago, beyond the 5-minute tolerance
        let header = sign(payload, SECRET, now() - 600);

        let verifier = WebhookVerifier::new(SECRET);
        let err = verifier.verify(payload, &header).unwrap_err();
        assert!(matches!(err, PaymentError::Signature(_)));
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let payload = b"{}";
        let header = sign(payload, SECRET, now() + 600);

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(payload, &header).is_err());
    }

    #[test]
    fn test_missing_timestamp_errors() {
        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(b"{}", "v1=deadbeef").is_err());
    }

    #[test]
    fn test_missing_signature_errors() {
        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(b"{}", "t=1234567890").is_err());
    }

    #[test]
    fn test_garbage_header_errors() {
        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(b"{}", "garbage").is_err());
        assert!(verifier.verify(b"{}", "").is_err());
    }

    #[test]
    fn test_any_matching_v1_entry_passes() {
        let payload = b"{}";
        let timestamp = now();
        let good = sign(payload, SECRET, timestamp);
        let good_sig = good.split_once(",v1=").map(|(_, sig)| sig).unwrap();
        let header = format!("t={timestamp},v1=0000,v1={good_sig}");

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(payload, &header).is_ok());
    }

    #[test]
    fn test_non_hex_signature_rejected_cleanly() {
        let payload = b"{}";
        let header = format!("t={},v1=not-hex-at-all", now());

        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(payload, &header).is_err());
    }
}
