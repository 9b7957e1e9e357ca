//! End-to-end lifecycle tests against the in-memory store
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use async_trait::async_trait;
use dineflow_billing::{
    BillingPeriod, BillingResult, BillingService, InMemorySubscriptionStore, LifecycleEvent,
    PaymentProcessor, PurchaseDetails, ReconcileOutcome, Reconciler, SubscriptionFilter,
    SubscriptionStore, WebhookVerifier,
};
use dineflow_shared::{AccountId, PlanType, SubscriptionRecord, SubscriptionStatus};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const T: OffsetDateTime = datetime!(2025-02-10 09:30 UTC);
const RENEWED_START: OffsetDateTime = datetime!(2025-03-10 09:30 UTC);
const RENEWED_END: OffsetDateTime = datetime!(2025-04-10 09:30 UTC);

/// Processor stub that always reports the same renewed period
struct RenewedProcessor;

#[async_trait]
impl PaymentProcessor for RenewedProcessor {
    async fn fetch_subscription_period(&self, _: &str) -> BillingResult<BillingPeriod> {
        Ok(BillingPeriod {
            start: RENEWED_START,
            end: RENEWED_END,
        })
    }
}

fn setup() -> (Arc<InMemorySubscriptionStore>, Reconciler) {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let reconciler = Reconciler::new(store.clone(), Arc::new(RenewedProcessor));
    (store, reconciler)
}

fn checkout(account: AccountId, plan: &str, sub: &str) -> LifecycleEvent {
    LifecycleEvent::CheckoutCompleted(PurchaseDetails {
        account_ref: Some(account.to_string()),
        plan_tag: Some(plan.to_string()),
        auto_renew: true,
        subscription_ref: Some(sub.to_string()),
        customer_ref: Some("cus_42".to_string()),
    })
}

fn one_time(account: AccountId, plan: &str) -> LifecycleEvent {
    LifecycleEvent::OneTimePaymentSucceeded(PurchaseDetails {
        account_ref: Some(account.to_string()),
        plan_tag: Some(plan.to_string()),
        auto_renew: false,
        subscription_ref: None,
        customer_ref: Some("cus_42".to_string()),
    })
}

async fn record_for(store: &InMemorySubscriptionStore, account: AccountId) -> SubscriptionRecord {
    store
        .find(SubscriptionFilter::AccountId(account))
        .await
        .unwrap()
        .expect("record should exist")
}

/// Compare the fields the reconciler owns (bookkeeping timestamps excluded)
fn business_fields(
    r: &SubscriptionRecord,
) -> (PlanType, SubscriptionStatus, OffsetDateTime, OffsetDateTime, Option<String>, Option<String>) {
    (
        r.plan_type,
        r.status,
        r.current_period_start,
        r.current_period_end,
        r.stripe_subscription_id.clone(),
        r.stripe_customer_id.clone(),
    )
}

#[tokio::test]
async fn annual_checkout_sets_period_from_now() {
    let (store, reconciler) = setup();
    let account = AccountId::new();

    let outcome = reconciler
        .handle_at(&checkout(account, "annual", "sub_annual"), T)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let record = record_for(&store, account).await;
    assert_eq!(record.plan_type, PlanType::Annual);
    assert_eq!(record.status, SubscriptionStatus::Active);
    assert_eq!(record.current_period_start, T);
    assert_eq!(record.current_period_end, T + Duration::days(365));
    assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_annual"));
    assert_eq!(record.stripe_customer_id.as_deref(), Some("cus_42"));
}

#[tokio::test]
async fn checkout_is_idempotent() {
    let (store, reconciler) = setup();
    let account = AccountId::new();
    let event = checkout(account, "semiannual", "sub_1");

    reconciler.handle_at(&event, T).await.unwrap();
    let once = record_for(&store, account).await;

    reconciler.handle_at(&event, T).await.unwrap();
    let twice = record_for(&store, account).await;

    assert_eq!(store.all().await.len(), 1);
    assert_eq!(once.id, twice.id);
    assert_eq!(business_fields(&once), business_fields(&twice));
}

#[tokio::test]
async fn payment_failure_only_changes_status() {
    let (store, reconciler) = setup();
    let account = AccountId::new();
    reconciler
        .handle_at(&checkout(account, "monthly", "sub_1"), T)
        .await
        .unwrap();
    let before = record_for(&store, account).await;

    let outcome = reconciler
        .handle_at(
            &LifecycleEvent::InvoicePaymentFailed {
                subscription_ref: Some("sub_1".into()),
            },
            T + Duration::days(30),
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let after = record_for(&store, account).await;
    assert_eq!(after.status, SubscriptionStatus::PastDue);
    assert_eq!(after.current_period_start, before.current_period_start);
    assert_eq!(after.current_period_end, before.current_period_end);
    assert_eq!(after.plan_type, before.plan_type);
}

#[tokio::test]
async fn invoice_success_reactivates_cancelled_subscription() {
    let (store, reconciler) = setup();
    let account = AccountId::new();
    reconciler
        .handle_at(&checkout(account, "monthly", "sub_1"), T)
        .await
        .unwrap();

    reconciler
        .handle_at(
            &LifecycleEvent::SubscriptionCancelled {
                subscription_ref: Some("sub_1".into()),
            },
            T,
        )
        .await
        .unwrap();
    assert_eq!(
        record_for(&store, account).await.status,
        SubscriptionStatus::Cancelled
    );

    reconciler
        .handle_at(
            &LifecycleEvent::InvoicePaymentSucceeded {
                subscription_ref: Some("sub_1".into()),
            },
            T,
        )
        .await
        .unwrap();

    let record = record_for(&store, account).await;
    assert_eq!(record.status, SubscriptionStatus::Active);
    assert_eq!(record.current_period_start, RENEWED_START);
    assert_eq!(record.current_period_end, RENEWED_END);
}

#[tokio::test]
async fn unknown_subscription_ref_mutates_nothing() {
    let (store, reconciler) = setup();
    let account = AccountId::new();
    reconciler
        .handle_at(&checkout(account, "monthly", "sub_1"), T)
        .await
        .unwrap();
    let before = record_for(&store, account).await;

    for event in [
        LifecycleEvent::InvoicePaymentSucceeded {
            subscription_ref: Some("sub_unknown".into()),
        },
        LifecycleEvent::InvoicePaymentFailed {
            subscription_ref: Some("sub_unknown".into()),
        },
        LifecycleEvent::SubscriptionCancelled {
            subscription_ref: Some("sub_unknown".into()),
        },
    ] {
        let outcome = reconciler.handle_at(&event, T).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::NoMatchingRecord);
    }

    assert_eq!(record_for(&store, account).await, before);
}

#[tokio::test]
async fn one_time_payment_never_sets_subscription_ref() {
    let (store, reconciler) = setup();
    let fresh = AccountId::new();

    reconciler.handle_at(&one_time(fresh, "annual"), T).await.unwrap();
    let record = record_for(&store, fresh).await;
    assert_eq!(record.stripe_subscription_id, None);
    assert_eq!(record.current_period_end, T + Duration::days(365));

    // An existing recurring link survives a later one-time purchase
    let recurring = AccountId::new();
    reconciler
        .handle_at(&checkout(recurring, "monthly", "sub_keep"), T)
        .await
        .unwrap();
    reconciler
        .handle_at(&one_time(recurring, "semiannual"), T)
        .await
        .unwrap();

    let record = record_for(&store, recurring).await;
    assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_keep"));
    assert_eq!(record.plan_type, PlanType::Semiannual);
}

#[tokio::test]
async fn signed_webhook_flows_through_billing_service() {
    let store = Arc::new(InMemorySubscriptionStore::new());
    let verifier = WebhookVerifier::new("whsec_integration", 300);
    let service = BillingService::with_parts(verifier.clone(), store.clone(), Arc::new(RenewedProcessor));
    let account = AccountId::new();

    let payload = serde_json::json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "created": OffsetDateTime::now_utc().unix_timestamp(),
        "data": { "object": {
            "id": "cs_1",
            "subscription": "sub_webhook",
            "customer": "cus_webhook",
            "metadata": { "user_id": account.to_string(), "plan_type": "monthly", "auto_renew": "true" }
        }}
    })
    .to_string();
    let header = verifier
        .sign(&payload, OffsetDateTime::now_utc().unix_timestamp())
        .unwrap();

    let (event, outcome) = service.process_webhook(&payload, &header).await.unwrap();
    assert_eq!(event.id, "evt_checkout");
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let access = service
        .access
        .check_access(account, OffsetDateTime::now_utc())
        .await
        .unwrap();
    assert!(access.has_access);
    assert_eq!(access.days_remaining, 30);
    assert!(access.subscription.unwrap().is_recurring());
}
