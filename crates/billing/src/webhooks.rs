//! Stripe webhook verification
//!
//! Signature header format: `t=<unix>,v1=<hex>[,v1=<hex>...]`. The expected
//! signature is HMAC-SHA256 over `"<t>.<raw body>"` keyed with the webhook
//! secret. Any listed `v1` may match.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};
use crate::events::ProcessorEvent;

type HmacSha256 = Hmac<Sha256>;

/// Verifies signed webhook payloads and decodes them into [`ProcessorEvent`]s
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify the signature and parse the event
    pub fn verify_event(&self, payload: &str, signature: &str) -> BillingResult<ProcessorEvent> {
        self.verify_event_at(payload, signature, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Same as [`verify_event`](Self::verify_event) with an explicit clock
    pub fn verify_event_at(
        &self,
        payload: &str,
        signature: &str,
        now: i64,
    ) -> BillingResult<ProcessorEvent> {
        self.verify_signature(payload, signature, now)?;

        let event = ProcessorEvent::parse(payload).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse webhook event JSON");
            e
        })?;

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.lifecycle.type_name(),
            "Webhook signature verified"
        );

        Ok(event)
    }

    fn verify_signature(&self, payload: &str, signature: &str, now: i64) -> BillingResult<()> {
        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = value.parse().ok(),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            tracing::warn!("Missing timestamp in signature header");
            BillingError::WebhookSignatureInvalid
        })?;

        if candidates.is_empty() {
            tracing::warn!("Missing v1 signature in signature header");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let tolerance = u64::try_from(self.tolerance_secs).unwrap_or(0);
        let within_tolerance = now
            .checked_sub(timestamp)
            .map(i64::unsigned_abs)
            .is_some_and(|age| age <= tolerance);

        if !within_tolerance {
            tracing::warn!(
                timestamp = timestamp,
                now = now,
                tolerance = self.tolerance_secs,
                "Webhook timestamp outside tolerance"
            );
            return Err(BillingError::WebhookSignatureInvalid);
        }

        let expected = self.compute_signature(timestamp, payload)?;

        let matched = candidates.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| bool::from(bytes.as_slice().ct_eq(expected.as_slice())))
                .unwrap_or(false)
        });

        if !matched {
            tracing::warn!("Webhook signature mismatch");
            return Err(BillingError::WebhookSignatureInvalid);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &str) -> BillingResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| BillingError::Config("Invalid webhook secret".to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Build a `stripe-signature` header value for a payload.
    ///
    /// Used by tests and local tooling that replays events.
    pub fn sign(&self, payload: &str, timestamp: i64) -> BillingResult<String> {
        let signature = self.compute_signature(timestamp, payload)?;
        Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LifecycleEvent;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn payload() -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "customer.subscription.deleted",
            "created": NOW,
            "data": { "object": { "id": "sub_1" } }
        })
        .to_string()
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET, 300)
    }

    #[test]
    fn test_accepts_correct_signature() {
        let body = payload();
        let header = verifier().sign(&body, NOW).unwrap();

        let event = verifier().verify_event_at(&body, &header, NOW + 10).unwrap();
        assert_eq!(event.id, "evt_1");
        assert_eq!(
            event.lifecycle,
            LifecycleEvent::SubscriptionCancelled {
                subscription_ref: Some("sub_1".into())
            }
        );
    }

    #[test]
    fn test_any_v1_may_match() {
        let body = payload();
        let good = verifier().sign(&body, NOW).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);

        assert!(verifier().verify_event_at(&body, &header, NOW).is_ok());
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let body = payload();
        let header = WebhookVerifier::new("whsec_other", 300).sign(&body, NOW).unwrap();

        assert!(matches!(
            verifier().verify_event_at(&body, &header, NOW),
            Err(BillingError::WebhookSignatureInvalid)
        ));
    }

    #[test]
    fn test_rejects_tampered_body() {
        let body = payload();
        let header = verifier().sign(&body, NOW).unwrap();
        let tampered = body.replace("sub_1", "sub_2");

        assert!(matches!(
            verifier().verify_event_at(&tampered, &header, NOW),
            Err(BillingError::WebhookSignatureInvalid)
        ));
    }

    #[test]
    fn test_rejects_stale_and_future_timestamps() {
        let body = payload();
        let header = verifier().sign(&body, NOW).unwrap();

        assert!(verifier().verify_event_at(&body, &header, NOW + 301).is_err());
        assert!(verifier().verify_event_at(&body, &header, NOW - 301).is_err());
        assert!(verifier().verify_event_at(&body, &header, NOW + 300).is_ok());
    }

    #[test]
    fn test_extreme_timestamps_are_rejected_without_overflow() {
        let body = payload();
        let v1 = "0".repeat(64);

        for t in [i64::MIN, i64::MAX, -1] {
            let header = format!("t={},v1={}", t, v1);
            assert!(matches!(
                verifier().verify_event_at(&body, &header, NOW),
                Err(BillingError::WebhookSignatureInvalid)
            ));
        }

        let header = format!("t={},v1={}", NOW, v1);
        assert!(matches!(
            verifier().verify_event_at(&body, &header, i64::MIN),
            Err(BillingError::WebhookSignatureInvalid)
        ));
    }

    #[test]
    fn test_rejects_header_without_v1() {
        let body = payload();
        let header = format!("t={}", NOW);
        assert!(verifier().verify_event_at(&body, &header, NOW).is_err());

        assert!(verifier().verify_event_at(&body, "garbage", NOW).is_err());
    }

    #[test]
    fn test_signed_but_malformed_payload_is_payload_error() {
        let body = "{\"not\":\"an event\"}";
        let header = verifier().sign(body, NOW).unwrap();

        assert!(matches!(
            verifier().verify_event_at(body, &header, NOW),
            Err(BillingError::WebhookPayload(_))
        ));
    }
}
