//! Subscription lifecycle reconciler
//!
//! Applies one verified processor event to the subscription store. Each event
//! results in at most one mutation: an upsert keyed on the account (checkout
//! and one-time payments) or a field-scoped update addressed by the Stripe
//! subscription id (invoice and cancellation events).
//!
//! There is no ordering guard. The latest delivered event always wins, so a
//! cancelled record is reactivated by a later successful invoice.

use std::sync::Arc;

use dineflow_shared::{AccountId, SubscriptionStatus};
use time::OffsetDateTime;

use crate::error::{BillingError, BillingResult};
use crate::events::{LifecycleEvent, PurchaseDetails};
use crate::plans::{plan_duration, resolve_plan};
use crate::processor::PaymentProcessor;
use crate::store::{SubscriptionFilter, SubscriptionStore, SubscriptionUpdate, SubscriptionUpsert};

/// What handling an event did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Exactly one record was written
    Applied,
    /// The payload lacked the account or subscription linkage
    Skipped,
    /// The subscription ref matched no stored record
    NoMatchingRecord,
    /// Event type the reconciler does not act on
    Ignored,
}

pub struct Reconciler {
    store: Arc<dyn SubscriptionStore>,
    processor: Arc<dyn PaymentProcessor>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn SubscriptionStore>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { store, processor }
    }

    pub async fn handle(&self, event: &LifecycleEvent) -> BillingResult<ReconcileOutcome> {
        self.handle_at(event, OffsetDateTime::now_utc()).await
    }

    /// Handle an event with `now` as the start of any newly created period
    pub async fn handle_at(
        &self,
        event: &LifecycleEvent,
        now: OffsetDateTime,
    ) -> BillingResult<ReconcileOutcome> {
        match event {
            LifecycleEvent::CheckoutCompleted(details) => {
                self.apply_purchase(event, details, true, now).await
            }
            LifecycleEvent::OneTimePaymentSucceeded(details) => {
                self.apply_purchase(event, details, false, now).await
            }
            LifecycleEvent::InvoicePaymentSucceeded { subscription_ref } => {
                let Some(sub_ref) = subscription_ref.as_deref() else {
                    return Ok(skip(event, "invoice has no subscription reference"));
                };

                let filter = SubscriptionFilter::StripeSubscriptionId(sub_ref.to_string());
                if self.store.find(filter).await?.is_none() {
                    return Ok(no_matching_record(event, sub_ref));
                }

                let period = match self.processor.fetch_subscription_period(sub_ref).await {
                    Ok(period) => period,
                    Err(BillingError::SubscriptionNotFound(_)) => {
                        tracing::warn!(
                            subscription_id = %sub_ref,
                            "Stripe no longer knows this subscription, leaving record as is"
                        );
                        return Ok(ReconcileOutcome::NoMatchingRecord);
                    }
                    Err(e) => return Err(e),
                };
                let update = SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Active),
                    current_period_start: Some(period.start),
                    current_period_end: Some(period.end),
                };
                self.update_by_ref(event, sub_ref, update).await
            }
            LifecycleEvent::InvoicePaymentFailed { subscription_ref } => {
                let Some(sub_ref) = subscription_ref.as_deref() else {
                    return Ok(skip(event, "invoice has no subscription reference"));
                };
                self.update_by_ref(event, sub_ref, SubscriptionUpdate::status(SubscriptionStatus::PastDue))
                    .await
            }
            LifecycleEvent::SubscriptionCancelled { subscription_ref } => {
                let Some(sub_ref) = subscription_ref.as_deref() else {
                    return Ok(skip(event, "subscription object has no id"));
                };
                self.update_by_ref(event, sub_ref, SubscriptionUpdate::status(SubscriptionStatus::Cancelled))
                    .await
            }
            LifecycleEvent::Unhandled { event_type } => {
                tracing::debug!(event_type = %event_type, "Ignoring unhandled event type");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }

    async fn apply_purchase(
        &self,
        event: &LifecycleEvent,
        details: &PurchaseDetails,
        recurring: bool,
        now: OffsetDateTime,
    ) -> BillingResult<ReconcileOutcome> {
        let Some(raw_account) = details.account_ref.as_deref() else {
            return Ok(skip(event, "metadata has no user_id"));
        };

        let account_id = match AccountId::parse(raw_account) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    event_type = %event.type_name(),
                    error = %e,
                    "Skipping event: metadata user_id is not a valid account id"
                );
                return Ok(ReconcileOutcome::Skipped);
            }
        };

        let plan_tag = details.plan_tag.as_deref();
        let (plan_type, recognized) = resolve_plan(plan_tag);
        if !recognized {
            tracing::warn!(
                account_id = %account_id,
                plan_tag = ?plan_tag,
                "Unrecognized plan type, storing as monthly"
            );
        }

        let upsert = SubscriptionUpsert {
            account_id,
            plan_type,
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: now + plan_duration(plan_type.as_str()),
            stripe_subscription_id: if recurring {
                details.subscription_ref.clone()
            } else {
                None
            },
            stripe_customer_id: details.customer_ref.clone(),
        };

        let record = self.store.upsert(upsert).await?;

        tracing::info!(
            event_type = %event.type_name(),
            account_id = %record.account_id,
            plan_type = %record.plan_type,
            auto_renew = details.auto_renew,
            period_end = %record.current_period_end,
            "Subscription activated"
        );

        Ok(ReconcileOutcome::Applied)
    }

    async fn update_by_ref(
        &self,
        event: &LifecycleEvent,
        subscription_ref: &str,
        update: SubscriptionUpdate,
    ) -> BillingResult<ReconcileOutcome> {
        let status = update.status;
        let rows = self
            .store
            .update_where(
                SubscriptionFilter::StripeSubscriptionId(subscription_ref.to_string()),
                update,
            )
            .await?;

        if rows == 0 {
            return Ok(no_matching_record(event, subscription_ref));
        }

        tracing::info!(
            event_type = %event.type_name(),
            subscription_id = %subscription_ref,
            status = ?status,
            rows = rows,
            "Subscription updated"
        );

        Ok(ReconcileOutcome::Applied)
    }
}

fn no_matching_record(event: &LifecycleEvent, subscription_ref: &str) -> ReconcileOutcome {
    tracing::warn!(
        event_type = %event.type_name(),
        subscription_id = %subscription_ref,
        "No subscription record matches Stripe subscription"
    );
    ReconcileOutcome::NoMatchingRecord
}

fn skip(event: &LifecycleEvent, reason: &str) -> ReconcileOutcome {
    tracing::warn!(
        event_type = %event.type_name(),
        reason = reason,
        "Skipping event with missing linkage"
    );
    ReconcileOutcome::Skipped
}
