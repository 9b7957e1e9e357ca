// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Dineflow Billing Module
//!
//! Keeps the `subscriptions` table in sync with Stripe and projects it for the
//! billing page.
//!
//! ## Features
//!
//! - **Webhooks**: Verify Stripe signatures and narrow payloads to lifecycle events
//! - **Reconciler**: Apply checkout, payment, invoice and cancellation events
//! - **Plans**: Billing periods, prices and feature entitlements
//! - **Access**: Effective status, days remaining and feature flags per account

pub mod access;
pub mod client;
pub mod error;
pub mod events;
pub mod plans;
pub mod processor;
pub mod reconciler;
pub mod store;
pub mod webhooks;

// Access
pub use access::{days_remaining, effective_status, AccessService, SubscriptionAccess};

// Client
pub use client::{StripeClient, StripeConfig, DEFAULT_WEBHOOK_TOLERANCE_SECS};

// Error
pub use error::{BillingError, BillingResult};

// Events
pub use events::{LifecycleEvent, ProcessorEvent, PurchaseDetails, WebhookEnvelope};

// Plans
pub use plans::{display_name, plan_duration, price_cents, resolve_plan, PlanFeatures};

// Processor
pub use processor::{BillingPeriod, PaymentProcessor, StripeProcessor};

// Reconciler
pub use reconciler::{ReconcileOutcome, Reconciler};

// Store
pub use store::{
    InMemorySubscriptionStore, PgSubscriptionStore, SubscriptionFilter, SubscriptionStore,
    SubscriptionUpdate, SubscriptionUpsert,
};

// Webhooks
pub use webhooks::WebhookVerifier;

use std::sync::Arc;

use sqlx::PgPool;

/// Main billing service that combines all billing functionality
pub struct BillingService {
    pub access: AccessService,
    pub reconciler: Reconciler,
    pub store: Arc<dyn SubscriptionStore>,
    pub webhooks: WebhookVerifier,
}

impl BillingService {
    /// Create a new billing service from environment variables
    pub fn from_env(pool: PgPool) -> BillingResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config, pool))
    }

    /// Create a new billing service with explicit config
    pub fn new(config: StripeConfig, pool: PgPool) -> Self {
        let webhooks = WebhookVerifier::new(&config.webhook_secret, config.webhook_tolerance_secs);
        let stripe = StripeClient::new(&config);

        Self::with_parts(
            webhooks,
            Arc::new(PgSubscriptionStore::new(pool)),
            Arc::new(StripeProcessor::new(stripe)),
        )
    }

    /// Assemble a service from explicit collaborators (in-memory store, fake processor)
    pub fn with_parts(
        webhooks: WebhookVerifier,
        store: Arc<dyn SubscriptionStore>,
        processor: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            access: AccessService::new(store.clone()),
            reconciler: Reconciler::new(store.clone(), processor),
            store,
            webhooks,
        }
    }

    /// Verify a signed webhook and apply it
    pub async fn process_webhook(
        &self,
        payload: &str,
        signature: &str,
    ) -> BillingResult<(ProcessorEvent, ReconcileOutcome)> {
        let event = self.webhooks.verify_event(payload, signature)?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.lifecycle.type_name(),
            "Processing Stripe webhook"
        );

        let outcome = self.reconciler.handle(&event.lifecycle).await?;
        Ok((event, outcome))
    }
}
