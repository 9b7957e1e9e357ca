//! Payment processor queries
//!
//! The invoice path treats the processor's subscription object as the source
//! of truth for billing period boundaries.

use async_trait::async_trait;
use stripe::{StripeError, SubscriptionId};
use time::OffsetDateTime;

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};

/// Authoritative billing period of a recurring subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl BillingPeriod {
    /// Build a period from unix-second timestamps
    pub fn from_unix(start: i64, end: i64) -> BillingResult<Self> {
        let convert = |ts: i64| {
            OffsetDateTime::from_unix_timestamp(ts)
                .map_err(|e| BillingError::StripeApi(format!("Invalid period timestamp {}: {}", ts, e)))
        };
        Ok(Self {
            start: convert(start)?,
            end: convert(end)?,
        })
    }
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn fetch_subscription_period(&self, subscription_ref: &str) -> BillingResult<BillingPeriod>;
}

/// [`PaymentProcessor`] backed by the Stripe API
#[derive(Clone)]
pub struct StripeProcessor {
    stripe: StripeClient,
}

impl StripeProcessor {
    pub fn new(stripe: StripeClient) -> Self {
        Self { stripe }
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn fetch_subscription_period(&self, subscription_ref: &str) -> BillingResult<BillingPeriod> {
        let sub_id = subscription_ref
            .parse::<SubscriptionId>()
            .map_err(|e| BillingError::StripeApi(format!("Invalid subscription ID: {}", e)))?;

        let subscription = stripe::Subscription::retrieve(self.stripe.inner(), &sub_id, &[])
            .await
            .map_err(|e| match e {
                StripeError::Stripe(ref req) if req.http_status == 404 => {
                    BillingError::SubscriptionNotFound(subscription_ref.to_string())
                }
                other => BillingError::from(other),
            })?;

        tracing::debug!(
            subscription_id = %subscription.id,
            period_start = subscription.current_period_start,
            period_end = subscription.current_period_end,
            "Fetched subscription period from Stripe"
        );

        BillingPeriod::from_unix(subscription.current_period_start, subscription.current_period_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_period_from_unix_seconds() {
        let period = BillingPeriod::from_unix(1_735_689_600, 1_738_368_000).unwrap();
        assert_eq!(period.start, datetime!(2025-01-01 0:00 UTC));
        assert_eq!(period.end, datetime!(2025-02-01 0:00 UTC));
    }

    #[test]
    fn test_period_rejects_out_of_range_timestamp() {
        assert!(BillingPeriod::from_unix(0, i64::MAX).is_err());
    }
}
