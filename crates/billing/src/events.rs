//! Lifecycle events
//!
//! Stripe payloads are decoded into a small envelope and then narrowed to the
//! handful of event kinds the reconciler acts on. Expandable references
//! (`customer`, `subscription`) may arrive either as a bare id or as an
//! expanded object, both are accepted.

use serde::Deserialize;
use serde_json::Value;

use crate::error::BillingResult;

/// Stripe event type names the reconciler acts on
pub mod event_types {
    pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
    pub const PAYMENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
    pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
    pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
    pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
}

/// Raw webhook envelope (`{"id", "type", "created", "data": {"object": ...}}`)
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: Option<i64>,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeData {
    pub object: Value,
}

/// Purchase details carried in checkout session / payment intent metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseDetails {
    /// Raw `metadata.user_id`
    pub account_ref: Option<String>,
    /// Raw `metadata.plan_type`
    pub plan_tag: Option<String>,
    /// `metadata.auto_renew == "true"`
    pub auto_renew: bool,
    pub subscription_ref: Option<String>,
    pub customer_ref: Option<String>,
}

/// A verified processor event, narrowed to what the reconciler understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    CheckoutCompleted(PurchaseDetails),
    OneTimePaymentSucceeded(PurchaseDetails),
    InvoicePaymentSucceeded { subscription_ref: Option<String> },
    InvoicePaymentFailed { subscription_ref: Option<String> },
    SubscriptionCancelled { subscription_ref: Option<String> },
    Unhandled { event_type: String },
}

impl LifecycleEvent {
    /// Stripe name of the event kind (`"unhandled"` events keep their own name)
    pub fn type_name(&self) -> &str {
        match self {
            Self::CheckoutCompleted(_) => event_types::CHECKOUT_COMPLETED,
            Self::OneTimePaymentSucceeded(_) => event_types::PAYMENT_INTENT_SUCCEEDED,
            Self::InvoicePaymentSucceeded { .. } => event_types::INVOICE_PAYMENT_SUCCEEDED,
            Self::InvoicePaymentFailed { .. } => event_types::INVOICE_PAYMENT_FAILED,
            Self::SubscriptionCancelled { .. } => event_types::SUBSCRIPTION_DELETED,
            Self::Unhandled { event_type } => event_type,
        }
    }

    /// Narrow an envelope to a lifecycle event
    pub fn from_envelope(envelope: &WebhookEnvelope) -> Self {
        let object = &envelope.data.object;
        match envelope.event_type.as_str() {
            event_types::CHECKOUT_COMPLETED => {
                Self::CheckoutCompleted(purchase_details(object, true))
            }
            event_types::PAYMENT_INTENT_SUCCEEDED => {
                Self::OneTimePaymentSucceeded(purchase_details(object, false))
            }
            event_types::INVOICE_PAYMENT_SUCCEEDED => Self::InvoicePaymentSucceeded {
                subscription_ref: invoice_subscription(object),
            },
            event_types::INVOICE_PAYMENT_FAILED => Self::InvoicePaymentFailed {
                subscription_ref: invoice_subscription(object),
            },
            event_types::SUBSCRIPTION_DELETED => Self::SubscriptionCancelled {
                subscription_ref: string_field(object, "id"),
            },
            other => Self::Unhandled {
                event_type: other.to_string(),
            },
        }
    }
}

/// An envelope paired with its narrowed lifecycle event
#[derive(Debug, Clone)]
pub struct ProcessorEvent {
    pub id: String,
    pub created: Option<i64>,
    pub lifecycle: LifecycleEvent,
}

impl ProcessorEvent {
    pub fn parse(payload: &str) -> BillingResult<Self> {
        let envelope: WebhookEnvelope = serde_json::from_str(payload)?;
        Ok(Self::from(envelope))
    }
}

impl From<WebhookEnvelope> for ProcessorEvent {
    fn from(envelope: WebhookEnvelope) -> Self {
        let lifecycle = LifecycleEvent::from_envelope(&envelope);
        Self {
            id: envelope.id,
            created: envelope.created,
            lifecycle,
        }
    }
}

fn purchase_details(object: &Value, with_subscription: bool) -> PurchaseDetails {
    let metadata = object.get("metadata");
    let meta = |key: &str| {
        metadata
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    };

    PurchaseDetails {
        account_ref: meta("user_id"),
        plan_tag: meta("plan_type"),
        auto_renew: meta("auto_renew").as_deref() == Some("true"),
        subscription_ref: if with_subscription {
            expandable_id(object.get("subscription"))
        } else {
            None
        },
        customer_ref: expandable_id(object.get("customer")),
    }
}

/// `invoice.subscription`, or `invoice.parent.subscription_details.subscription`
/// on newer API versions
fn invoice_subscription(invoice: &Value) -> Option<String> {
    expandable_id(invoice.get("subscription")).or_else(|| {
        expandable_id(
            invoice
                .get("parent")
                .and_then(|p| p.get("subscription_details"))
                .and_then(|d| d.get("subscription")),
        )
    })
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Id of an expandable field: either `"sub_123"` or `{"id": "sub_123", ...}`
fn expandable_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        obj @ Value::Object(_) => string_field(obj, "id"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: Value) -> WebhookEnvelope {
        serde_json::from_value(json!({
            "id": "evt_test",
            "type": event_type,
            "created": 1_700_000_000,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn test_checkout_session_metadata() {
        let env = envelope(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "subscription": "sub_1",
                "customer": { "id": "cus_1", "object": "customer" },
                "metadata": { "user_id": "u1", "plan_type": "annual", "auto_renew": "true" }
            }),
        );

        assert_eq!(
            LifecycleEvent::from_envelope(&env),
            LifecycleEvent::CheckoutCompleted(PurchaseDetails {
                account_ref: Some("u1".into()),
                plan_tag: Some("annual".into()),
                auto_renew: true,
                subscription_ref: Some("sub_1".into()),
                customer_ref: Some("cus_1".into()),
            })
        );
    }

    #[test]
    fn test_payment_intent_never_carries_subscription() {
        let env = envelope(
            "payment_intent.succeeded",
            json!({
                "id": "pi_1",
                "subscription": "sub_should_be_ignored",
                "customer": "cus_1",
                "metadata": { "user_id": "u1", "plan_type": "monthly" }
            }),
        );

        match LifecycleEvent::from_envelope(&env) {
            LifecycleEvent::OneTimePaymentSucceeded(details) => {
                assert_eq!(details.subscription_ref, None);
                assert_eq!(details.customer_ref.as_deref(), Some("cus_1"));
                assert!(!details.auto_renew);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_missing_metadata_yields_empty_linkage() {
        let env = envelope("checkout.session.completed", json!({ "id": "cs_1" }));
        match LifecycleEvent::from_envelope(&env) {
            LifecycleEvent::CheckoutCompleted(details) => {
                assert_eq!(details, PurchaseDetails::default());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_invoice_subscription_ref_variants() {
        let legacy = envelope("invoice.payment_failed", json!({ "subscription": "sub_1" }));
        assert_eq!(
            LifecycleEvent::from_envelope(&legacy),
            LifecycleEvent::InvoicePaymentFailed {
                subscription_ref: Some("sub_1".into())
            }
        );

        let nested = envelope(
            "invoice.payment_succeeded",
            json!({ "parent": { "subscription_details": { "subscription": "sub_2" } } }),
        );
        assert_eq!(
            LifecycleEvent::from_envelope(&nested),
            LifecycleEvent::InvoicePaymentSucceeded {
                subscription_ref: Some("sub_2".into())
            }
        );

        let none = envelope("invoice.payment_succeeded", json!({ "subscription": null }));
        assert_eq!(
            LifecycleEvent::from_envelope(&none),
            LifecycleEvent::InvoicePaymentSucceeded {
                subscription_ref: None
            }
        );
    }

    #[test]
    fn test_subscription_deleted_uses_object_id() {
        let env = envelope("customer.subscription.deleted", json!({ "id": "sub_9" }));
        assert_eq!(
            LifecycleEvent::from_envelope(&env),
            LifecycleEvent::SubscriptionCancelled {
                subscription_ref: Some("sub_9".into())
            }
        );
    }

    #[test]
    fn test_unknown_event_is_unhandled() {
        let env = envelope("customer.created", json!({ "id": "cus_1" }));
        let event = LifecycleEvent::from_envelope(&env);
        assert_eq!(
            event,
            LifecycleEvent::Unhandled {
                event_type: "customer.created".into()
            }
        );
        assert_eq!(event.type_name(), "customer.created");
    }

    #[test]
    fn test_parse_rejects_non_event_json() {
        assert!(ProcessorEvent::parse("{\"hello\": 1}").is_err());
        assert!(ProcessorEvent::parse("not json").is_err());
    }
}
